//! Agent process traits

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::LaunchError;

/// Lifecycle state of a spawned agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Running,
    Exited(Option<i32>),
}

/// Snapshot of an agent process owned by a controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProcess {
    /// Executable the process was started from
    pub path: PathBuf,
    /// OS process identifier, if the OS reported one
    pub pid: Option<u32>,
    pub state: AgentState,
}

/// Starts and stops the external tunneling agent
#[async_trait]
pub trait AgentControl: Send + Sync {
    /// Whether the agent executable can be resolved
    fn is_installed(&self) -> bool;

    /// Spawn the agent headless and keep its handle
    async fn start(&self) -> Result<AgentProcess, LaunchError>;

    /// Terminate every agent this controller owns.
    ///
    /// Never fails; returns how many processes were terminated.
    async fn stop(&self) -> usize;
}
