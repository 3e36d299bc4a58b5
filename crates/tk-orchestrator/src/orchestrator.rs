//! Tunnel orchestration
//!
//! One call to [`TunnelOrchestrator::start_tunnels`] walks a single pass of:
//!
//! 1. list tunnels; success (even empty) means the agent is ready
//! 2. otherwise spawn the agent, wait the warm-up delay, list once more
//! 3. reuse tunnels that already target the desired address
//! 4. otherwise create one, retrying an unstructured failure exactly once
//! 5. return the tunnels, or report the failure to the sink and return `None`

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use tk_agent::ProcessController;
use tk_core::config::{AgentConfig, DesiredTunnel};
use tk_core::traits::{AgentControl, ControlApi};
use tk_core::{
    ApiError, ErrorSink, ReportContext, Severity, Tunnel, TunnelCreationRequest, TunnelError,
    TunnelProtocol,
};

use crate::api::ControlApiClient;

const DEFAULT_WARMUP_DELAY: Duration = Duration::from_millis(250);
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Tunnels serving the desired address after a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedTunnels {
    /// What was asked for
    pub desired: DesiredTunnel,
    /// Every tunnel forwarding to the desired address
    pub tunnels: Vec<Tunnel>,
    /// Whether this run created the tunnel (false when reused)
    pub created: bool,
    /// Public URL to hand out, `https` preferred
    pub public_url: String,
}

impl StartedTunnels {
    fn new(desired: DesiredTunnel, tunnels: Vec<Tunnel>, created: bool) -> Self {
        let public_url = tunnels
            .iter()
            .find(|t| t.proto == TunnelProtocol::Https)
            .or_else(|| tunnels.first())
            .map(|t| t.public_url.clone())
            .unwrap_or_default();

        Self {
            desired,
            tunnels,
            created,
            public_url,
        }
    }
}

/// Ensures the agent runs and the desired tunnel exists
pub struct TunnelOrchestrator {
    desired: DesiredTunnel,
    agent: Arc<dyn AgentControl>,
    api: Arc<dyn ControlApi>,
    sink: Arc<dyn ErrorSink>,
    warmup_delay: Duration,
    retry_delay: Duration,
}

impl TunnelOrchestrator {
    pub fn new(
        desired: DesiredTunnel,
        agent: Arc<dyn AgentControl>,
        api: Arc<dyn ControlApi>,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            desired,
            agent,
            api,
            sink,
            warmup_delay: DEFAULT_WARMUP_DELAY,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Override the warm-up wait and the pre-retry wait
    pub fn with_timing(mut self, warmup_delay: Duration, retry_delay: Duration) -> Self {
        self.warmup_delay = warmup_delay;
        self.retry_delay = retry_delay;
        self
    }

    /// Build an orchestrator with a real process controller and HTTP client
    pub fn from_config(
        config: &AgentConfig,
        desired: DesiredTunnel,
        sink: Arc<dyn ErrorSink>,
    ) -> Result<Self, ApiError> {
        let agent = Arc::new(ProcessController::new(config.clone()));
        let api = Arc::new(ControlApiClient::from_config(config)?);
        Ok(Self::new(desired, agent, api, sink).with_timing(config.warmup_delay, config.retry_delay))
    }

    /// Get the desired tunnel
    pub fn desired(&self) -> &DesiredTunnel {
        &self.desired
    }

    /// Whether the agent executable can be found
    pub fn is_installed(&self) -> bool {
        self.agent.is_installed()
    }

    /// Make sure the desired tunnel exists and return it.
    ///
    /// Never fails past this boundary: every failure, including a panic in
    /// a collaborator, is routed to the error sink and `None` is returned.
    /// If `cancel` fires after this call spawned the agent, the agent is
    /// stopped again.
    pub async fn start_tunnels(&self, cancel: &CancellationToken) -> Option<StartedTunnels> {
        let mut started_agent = false;
        let outcome = AssertUnwindSafe(self.run(cancel, &mut started_agent))
            .catch_unwind()
            .await;

        let err = match outcome {
            Ok(Ok(started)) => return Some(started),
            Ok(Err(err)) => err,
            Err(panic) => TunnelError::Unexpected(panic_message(panic.as_ref())),
        };

        if matches!(err, TunnelError::Cancelled) && started_agent {
            let stopped = self.agent.stop().await;
            tracing::info!(stopped, "Stopped the agent started by the cancelled run");
        }

        if err.severity() == Severity::Critical {
            tracing::error!(kind = %err.kind(), "Unexpected failure while starting tunnels");
        }
        self.report(&err);
        None
    }

    /// Terminate the agent processes owned by this orchestrator
    pub async fn stop_tunnels(&self) -> usize {
        self.agent.stop().await
    }

    async fn run(
        &self,
        cancel: &CancellationToken,
        started_agent: &mut bool,
    ) -> Result<StartedTunnels, TunnelError> {
        let tunnels = self.ensure_agent(cancel, started_agent).await?;
        let addr = self.desired.local_addr();

        let existing = matching(tunnels, &addr);
        if !existing.is_empty() {
            tracing::info!(
                addr = %addr,
                "Existing tunnels: {:?}",
                existing.iter().map(|t| t.public_url.as_str()).collect::<Vec<_>>()
            );
            return Ok(StartedTunnels::new(self.desired.clone(), existing, false));
        }

        let request = TunnelCreationRequest::for_desired(&self.desired);
        let tunnels = self.create(cancel, &request).await?;
        tracing::info!(
            addr = %addr,
            "Created tunnels: {:?}",
            tunnels.iter().map(|t| t.public_url.as_str()).collect::<Vec<_>>()
        );

        Ok(StartedTunnels::new(self.desired.clone(), tunnels, true))
    }

    /// List tunnels, spawning the agent first if its control API does not answer
    async fn ensure_agent(
        &self,
        cancel: &CancellationToken,
        started_agent: &mut bool,
    ) -> Result<Vec<Tunnel>, TunnelError> {
        match cancellable(cancel, self.api.list_tunnels()).await? {
            Ok(tunnels) => return Ok(tunnels),
            Err(e) => tracing::debug!("Agent not ready ({}), starting it", e),
        }

        let agent = self.agent.start().await.map_err(TunnelError::AgentNotFound)?;
        *started_agent = true;
        tracing::info!(
            pid = ?agent.pid,
            "Agent started, waiting {:?} for its control API",
            self.warmup_delay
        );

        cancellable(cancel, tokio::time::sleep(self.warmup_delay)).await?;

        cancellable(cancel, self.api.list_tunnels())
            .await?
            .map_err(TunnelError::AgentUnavailable)
    }

    async fn create(
        &self,
        cancel: &CancellationToken,
        request: &TunnelCreationRequest,
    ) -> Result<Vec<Tunnel>, TunnelError> {
        let first = match cancellable(cancel, self.api.create_tunnel(request)).await? {
            Ok(tunnel) => return Ok(vec![tunnel]),
            Err(e) => e,
        };

        if !first.is_transient() {
            return Err(creation_failure(request, first));
        }

        tracing::warn!(
            "Could not create tunnel for {} ({}): {}; retrying in {:?}",
            request.name,
            request.addr,
            first,
            self.retry_delay
        );
        cancellable(cancel, tokio::time::sleep(self.retry_delay)).await?;

        // The agent may have opened the tunnel before the transport gave up
        if first.is_transport() {
            match cancellable(cancel, self.api.list_tunnels()).await? {
                Ok(tunnels) => {
                    let existing = matching(tunnels, &request.addr);
                    if !existing.is_empty() {
                        tracing::info!(addr = %request.addr, "Tunnel appeared despite the failed request");
                        return Ok(existing);
                    }
                }
                Err(e) => tracing::debug!("Could not re-check tunnels before retrying: {}", e),
            }
        }

        // Final attempt
        cancellable(cancel, self.api.create_tunnel(request))
            .await?
            .map(|tunnel| vec![tunnel])
            .map_err(|e| creation_failure(request, e))
    }

    fn report(&self, err: &TunnelError) {
        let context = ReportContext {
            kind: err.kind(),
            local_addr: self.desired.local_addr(),
            tunnel_name: self.desired.tunnel_name(),
        };
        self.sink.report(err.severity(), &err.to_string(), &context);
    }
}

/// Await `fut` unless `cancel` fires first
async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, TunnelError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TunnelError::Cancelled),
        output = fut => Ok(output),
    }
}

/// Tunnels forwarding to `addr`
fn matching(tunnels: Vec<Tunnel>, addr: &str) -> Vec<Tunnel> {
    tunnels.into_iter().filter(|t| t.targets(addr)).collect()
}

fn creation_failure(request: &TunnelCreationRequest, err: ApiError) -> TunnelError {
    match err {
        ApiError::Structured { detail, .. } => TunnelError::StructuredApiError {
            name: request.name.clone(),
            addr: request.addr.clone(),
            detail,
        },
        ApiError::MalformedResponse { body, source } => TunnelError::Unexpected(format!(
            "control API returned an unreadable tunnel record ({}): {}",
            source, body
        )),
        other => TunnelError::TransientApiFailure {
            name: request.name.clone(),
            addr: request.addr.clone(),
            body: other.raw_text(),
        },
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
