//! List command implementation

use anyhow::{Context, Result};

use tk_core::config::AgentConfig;
use tk_core::traits::ControlApi;
use tk_orchestrator::ControlApiClient;

use crate::output::{format_tunnels, print_error};

/// Execute the list command
pub async fn list_command(config: &AgentConfig, long: bool) -> Result<()> {
    let client =
        ControlApiClient::from_config(config).context("Failed to set up the control API client")?;

    let tunnels = match client.list_tunnels().await {
        Ok(tunnels) => tunnels,
        Err(e) => {
            print_error(&format!(
                "Control API at {} is not responding: {}",
                client.base_url(),
                e
            ));
            print_error("Is the agent running? Try: tunnelkit start --port <port>");
            return Err(e.into());
        }
    };

    println!("{}", format_tunnels(&tunnels, long));

    Ok(())
}
