//! Start command implementation

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use tk_core::config::{ConfigFile, DesiredTunnel};
use tk_orchestrator::TunnelOrchestrator;

use crate::output::{format_tunnels, print_info, print_success, ConsoleSink};

/// Command-line overrides for `tunnelkit start`
#[derive(Debug, Default, Clone)]
pub struct StartOptions {
    pub port: Option<u16>,
    pub subdomain: Option<String>,
    pub name: Option<String>,
    pub agent_path: Option<PathBuf>,
    pub wait: bool,
}

impl StartOptions {
    /// Merge the flags over the `[tunnel]` section of the config file
    pub fn desired(&self, configured: Option<DesiredTunnel>) -> Result<DesiredTunnel> {
        let mut desired = match (self.port, configured) {
            (Some(port), Some(mut configured)) => {
                configured.port = port;
                configured
            }
            (Some(port), None) => DesiredTunnel::new(port),
            (None, Some(configured)) => configured,
            (None, None) => anyhow::bail!(
                "No port given. Pass --port or set `port` in the [tunnel] section of the config file"
            ),
        };

        if let Some(subdomain) = &self.subdomain {
            desired = desired.with_subdomain(subdomain.as_str());
        }
        if let Some(name) = &self.name {
            desired = desired.with_project_name(name.as_str());
        }
        Ok(desired)
    }
}

/// Execute the start command
pub async fn start_command(
    mut config: ConfigFile,
    options: StartOptions,
    cancel: CancellationToken,
) -> Result<()> {
    let desired = options.desired(config.tunnel.take())?;
    if let Some(path) = &options.agent_path {
        config.agent.executable_path = Some(path.clone());
    }

    let orchestrator =
        TunnelOrchestrator::from_config(&config.agent, desired, Arc::new(ConsoleSink))
            .context("Failed to set up the control API client")?;

    tracing::info!("Starting tunnel for {}", orchestrator.desired().local_addr());

    let Some(started) = orchestrator.start_tunnels(&cancel).await else {
        anyhow::bail!(
            "No tunnel for {}",
            orchestrator.desired().local_addr()
        );
    };

    if started.created {
        print_success(&format!("Tunnel created: {}", started.public_url));
    } else {
        print_success(&format!("Reusing tunnel: {}", started.public_url));
    }
    println!("{}", format_tunnels(&started.tunnels, false));

    if options.wait {
        print_info("Press Ctrl+C to stop the agent");
        cancel.cancelled().await;
        let stopped = orchestrator.stop_tunnels().await;
        print_success(&format!("Stopped {} agent process(es)", stopped));
    }

    Ok(())
}
