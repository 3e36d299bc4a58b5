//! Agent configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::{duration_millis, duration_secs, empty_path_as_none};

/// How to find, launch and reach the tunneling agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Explicit path to the agent executable; used when it names an existing file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable_path: Option<PathBuf>,

    /// Executable name searched for on PATH
    pub executable_name: String,

    /// Startup arguments (headless, no tunnels started)
    pub args: Vec<String>,

    /// Loopback address of the agent's control API
    pub api_address: String,

    /// Wait after spawning before the control API is polled again
    #[serde(with = "duration_millis")]
    pub warmup_delay: Duration,

    /// Wait before the single retry of a failed tunnel creation
    #[serde(with = "duration_millis")]
    pub retry_delay: Duration,

    /// Upper bound for each control API request
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,

    /// Where the PID of a spawned agent is recorded for later `stop` calls.
    ///
    /// An empty string turns the record off.
    #[serde(with = "empty_path_as_none")]
    pub pid_file: Option<PathBuf>,

    /// Also kill every process carrying the agent's name on stop.
    ///
    /// Off by default: it can terminate agents this tool never started.
    pub sweep_by_name: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            executable_path: None,
            executable_name: "ngrok".to_string(),
            args: vec!["start".to_string(), "--none".to_string()],
            api_address: "127.0.0.1:4040".to_string(),
            warmup_delay: Duration::from_millis(250),
            retry_delay: Duration::from_millis(1000),
            request_timeout: Duration::from_secs(10),
            pid_file: Some(crate::pidfile::default_pid_path()),
            sweep_by_name: false,
        }
    }
}

impl AgentConfig {
    /// Base URL of the control API (`http://host:port`)
    pub fn api_base_url(&self) -> String {
        format!("http://{}", self.api_address)
    }
}
