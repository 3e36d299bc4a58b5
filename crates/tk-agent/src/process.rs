//! Agent process controller

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use tk_core::config::AgentConfig;
use tk_core::pidfile::AgentRecord;
use tk_core::traits::{AgentControl, AgentProcess, AgentState};
use tk_core::LaunchError;

use crate::resolve::resolve_executable;

/// Gives the agent its own console window, like launching it by hand
#[cfg(windows)]
const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;

/// An agent spawned by this controller
struct OwnedAgent {
    path: PathBuf,
    pid: Option<u32>,
    child: Child,
}

/// Starts the agent and terminates exactly the agents it started
pub struct ProcessController {
    config: AgentConfig,
    /// Overrides the `PATH` lookup (used by tests and embedders)
    search_path: Option<OsString>,
    children: Mutex<Vec<OwnedAgent>>,
}

impl ProcessController {
    /// Create a controller that searches the process `PATH`
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            search_path: None,
            children: Mutex::new(Vec::new()),
        }
    }

    /// Search these directories instead of `PATH`
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Get the agent configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Resolve the agent executable from the configured path or the search path
    pub fn resolve(&self) -> Option<PathBuf> {
        resolve_executable(
            self.config.executable_path.as_deref(),
            &self.config.executable_name,
            self.search_path.as_deref(),
        )
    }

    /// Snapshot of the agents spawned by this controller
    pub async fn processes(&self) -> Vec<AgentProcess> {
        let mut children = self.children.lock().await;
        children
            .iter_mut()
            .map(|agent| AgentProcess {
                path: agent.path.clone(),
                pid: agent.pid,
                state: match agent.child.try_wait() {
                    Ok(Some(status)) => AgentState::Exited(status.code()),
                    _ => AgentState::Running,
                },
            })
            .collect()
    }

    /// Agent recorded by an earlier invocation that is still alive
    pub fn recorded_agent(&self) -> Option<AgentRecord> {
        let path = self.config.pid_file.as_ref()?;
        match AgentRecord::load(path) {
            Ok(Some(record)) if record.is_alive() => Some(record),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Ignoring unreadable agent record {:?}: {}", path, e);
                None
            }
        }
    }

    /// Whether a process name belongs to the agent executable
    fn is_agent_name(&self, process_name: &OsStr, recorded: Option<&Path>) -> bool {
        let Some(stem) = Path::new(process_name).file_stem() else {
            return false;
        };

        let configured = Path::new(&self.config.executable_name).file_stem();
        let explicit = self.config.executable_path.as_deref().and_then(Path::file_stem);
        let recorded = recorded.and_then(Path::file_stem);

        [configured, explicit, recorded].contains(&Some(stem))
    }

    /// Kill the agent recorded by an earlier invocation
    fn stop_recorded(&self, owned_pids: &[u32]) -> usize {
        let Some(path) = self.config.pid_file.as_ref() else {
            return 0;
        };

        let mut stopped = 0;
        if let Some(record) = self.recorded_agent() {
            if !owned_pids.contains(&record.pid) {
                let pid = Pid::from_u32(record.pid);
                let mut system = System::new();
                system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

                match system.process(pid) {
                    Some(process)
                        if self.is_agent_name(process.name(), record.executable.as_deref()) =>
                    {
                        if process.kill() {
                            tracing::info!(pid = record.pid, "Stopped recorded agent");
                            stopped += 1;
                        } else {
                            tracing::warn!(pid = record.pid, "Failed to stop recorded agent");
                        }
                    }
                    Some(process) => tracing::warn!(
                        pid = record.pid,
                        name = ?process.name(),
                        "Recorded PID now belongs to another program, leaving it alone"
                    ),
                    None => {}
                }
            }
        }

        if let Err(e) = AgentRecord::clear(path) {
            tracing::warn!("Failed to remove agent record {:?}: {}", path, e);
        }
        stopped
    }

    /// Kill every process that carries the agent's name
    fn sweep_by_name(&self) -> usize {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);
        let own_pid = std::process::id();

        let mut stopped = 0;
        for (pid, process) in system.processes() {
            if pid.as_u32() == own_pid || !self.is_agent_name(process.name(), None) {
                continue;
            }
            if process.kill() {
                tracing::info!(pid = pid.as_u32(), "Swept agent process by name");
                stopped += 1;
            }
        }
        stopped
    }
}

#[async_trait]
impl AgentControl for ProcessController {
    fn is_installed(&self) -> bool {
        self.resolve().is_some()
    }

    async fn start(&self) -> Result<AgentProcess, LaunchError> {
        let path = self.resolve().ok_or_else(|| LaunchError::NotFound {
            name: self.config.executable_name.clone(),
        })?;

        tracing::info!("Starting agent {:?} {:?}", path, self.config.args);

        let mut cmd = Command::new(&path);
        cmd.args(&self.config.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // Own process group: Ctrl+C in our terminal must not take the agent down
        #[cfg(unix)]
        cmd.process_group(0);

        #[cfg(windows)]
        cmd.creation_flags(CREATE_NEW_CONSOLE);

        let child = cmd
            .spawn()
            .map_err(|e| LaunchError::from_spawn(path.clone(), e))?;
        let pid = child.id();

        if let (Some(pid), Some(pid_file)) = (pid, self.config.pid_file.as_ref()) {
            if let Err(e) = AgentRecord::new(pid, path.as_path()).store(pid_file) {
                tracing::warn!("Failed to record agent PID in {:?}: {}", pid_file, e);
            }
        }
        tracing::debug!(pid = ?pid, "Agent spawned");

        self.children.lock().await.push(OwnedAgent {
            path: path.clone(),
            pid,
            child,
        });

        Ok(AgentProcess {
            path,
            pid,
            state: AgentState::Running,
        })
    }

    async fn stop(&self) -> usize {
        let mut stopped = 0;
        let mut owned_pids = Vec::new();

        {
            let mut children = self.children.lock().await;
            for mut agent in children.drain(..) {
                owned_pids.extend(agent.pid);
                match agent.child.try_wait() {
                    Ok(Some(status)) => {
                        tracing::debug!(pid = ?agent.pid, "Agent already exited ({})", status);
                    }
                    _ => match agent.child.kill().await {
                        Ok(()) => {
                            tracing::info!(pid = ?agent.pid, "Stopped agent");
                            stopped += 1;
                        }
                        Err(e) => tracing::warn!(pid = ?agent.pid, "Failed to stop agent: {}", e),
                    },
                }
            }
        }

        stopped += self.stop_recorded(&owned_pids);

        if self.config.sweep_by_name {
            stopped += self.sweep_by_name();
        }

        stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_without_pid_file(name: &str) -> AgentConfig {
        AgentConfig {
            executable_name: name.to_string(),
            pid_file: None,
            ..AgentConfig::default()
        }
    }

    #[tokio::test]
    async fn test_start_missing_executable() {
        let empty = TempDir::new().unwrap();
        let controller = ProcessController::new(config_without_pid_file("tk-missing-agent"))
            .with_search_path(empty.path().as_os_str());

        assert!(!controller.is_installed());
        let err = controller.start().await.unwrap_err();
        assert!(matches!(err, LaunchError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_stop_without_agent_is_noop() {
        let controller = ProcessController::new(config_without_pid_file("tk-missing-agent"));
        assert_eq!(controller.stop().await, 0);
        assert_eq!(controller.stop().await, 0);
        assert!(controller.processes().await.is_empty());
    }

    #[test]
    fn test_agent_name_matching() {
        let controller = ProcessController::new(AgentConfig {
            executable_path: Some(PathBuf::from("/opt/tools/ngrok-v3")),
            ..AgentConfig::default()
        });
        assert!(controller.is_agent_name(OsStr::new("ngrok"), None));
        assert!(controller.is_agent_name(OsStr::new("ngrok.exe"), None));
        assert!(controller.is_agent_name(OsStr::new("ngrok-v3"), None));
        assert!(!controller.is_agent_name(OsStr::new("nginx"), None));
        assert!(!controller.is_agent_name(OsStr::new(""), None));
        assert!(controller.is_agent_name(
            OsStr::new("agent-fork"),
            Some(Path::new("/tmp/agent-fork"))
        ));
    }

    #[cfg(unix)]
    fn sleeper(pid_dir: &TempDir) -> AgentConfig {
        AgentConfig {
            executable_name: "sleep".to_string(),
            args: vec!["30".to_string()],
            pid_file: Some(pid_dir.path().join("agent.pid")),
            ..AgentConfig::default()
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_start_then_stop_owned_agent() {
        let dir = TempDir::new().unwrap();
        let pid_file = dir.path().join("agent.pid");
        let controller = ProcessController::new(sleeper(&dir));

        let agent = controller.start().await.unwrap();
        assert_eq!(agent.state, AgentState::Running);
        let pid = agent.pid.expect("spawned process has a pid");
        let record = AgentRecord::load(&pid_file).unwrap().unwrap();
        assert_eq!(record.pid, pid);
        assert_eq!(record.executable.as_deref(), Some(agent.path.as_path()));

        let processes = controller.processes().await;
        assert_eq!(processes.len(), 1);
        assert_eq!(processes[0].state, AgentState::Running);

        assert_eq!(controller.stop().await, 1);
        assert!(controller.processes().await.is_empty());
        assert!(AgentRecord::load(&pid_file).unwrap().is_none());

        // Second stop has nothing left to do
        assert_eq!(controller.stop().await, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_from_another_controller_uses_pid_file() {
        let dir = TempDir::new().unwrap();
        let starter = ProcessController::new(sleeper(&dir));
        let agent = starter.start().await.unwrap();
        assert!(agent.pid.is_some());

        let stopper = ProcessController::new(sleeper(&dir));
        assert_eq!(stopper.recorded_agent().map(|r| r.pid), agent.pid);
        assert_eq!(stopper.stop().await, 1);
        assert!(stopper.recorded_agent().is_none());

        // Reap the killed child
        starter.stop().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_name_sweep_is_opt_in() {
        let dir = TempDir::new().unwrap();
        let foreign = dir.path().join("tk-sweep-agent");
        std::fs::copy("/bin/sleep", &foreign).unwrap();

        // Not started by any controller, so only the sweep can reach it
        let mut child = Command::new(&foreign)
            .arg("30")
            .kill_on_drop(true)
            .spawn()
            .unwrap();

        let config = AgentConfig {
            sweep_by_name: false,
            ..config_without_pid_file("tk-sweep-agent")
        };
        assert_eq!(ProcessController::new(config.clone()).stop().await, 0);
        assert!(child.try_wait().unwrap().is_none());

        let sweeping = ProcessController::new(AgentConfig {
            sweep_by_name: true,
            ..config
        });
        assert_eq!(sweeping.stop().await, 1);

        let status = tokio::time::timeout(std::time::Duration::from_secs(5), child.wait())
            .await
            .expect("swept process exits")
            .unwrap();
        assert!(!status.success());
    }
}
