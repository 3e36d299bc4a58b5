//! Status command implementation

use anyhow::{Context, Result};

use tk_agent::ProcessController;
use tk_core::config::AgentConfig;
use tk_core::traits::{AgentControl, ControlApi};
use tk_orchestrator::ControlApiClient;

use crate::output::{format_status, AgentStatus};

/// Execute the status command
pub async fn status_command(config: AgentConfig) -> Result<()> {
    let client =
        ControlApiClient::from_config(&config).context("Failed to set up the control API client")?;
    let controller = ProcessController::new(config);

    let tunnels = match client.list_tunnels().await {
        Ok(tunnels) => Some(tunnels.len()),
        Err(e) => {
            tracing::debug!("Control API not reachable: {}", e);
            None
        }
    };

    let status = AgentStatus {
        installed: controller.is_installed(),
        executable: controller.resolve(),
        recorded_pid: controller.recorded_agent().map(|record| record.pid),
        api_url: client.base_url().to_string(),
        tunnels,
    };

    println!("{}", format_status(&status));

    Ok(())
}
