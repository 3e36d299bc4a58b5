//! Stop command implementation

use anyhow::Result;

use tk_agent::ProcessController;
use tk_core::config::AgentConfig;
use tk_core::traits::AgentControl;

use crate::output::{print_success, print_warning};

/// Execute the stop command
pub async fn stop_command(mut config: AgentConfig, sweep: bool) -> Result<()> {
    config.sweep_by_name |= sweep;
    let controller = ProcessController::new(config);

    match controller.stop().await {
        0 => print_warning("No agent started by tunnelkit is running"),
        1 => print_success("Agent stopped"),
        n => print_success(&format!("Stopped {} agent processes", n)),
    }

    Ok(())
}
