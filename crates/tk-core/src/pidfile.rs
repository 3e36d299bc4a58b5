//! Record of the agent spawned by tunnelkit
//!
//! `tunnelkit start` and `tunnelkit stop` run as separate processes, so the
//! controller leaves an [`AgentRecord`] on disk: the PID on the first line,
//! the executable it launched on the second. A later stop only terminates
//! that PID while it still runs the recorded program.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config;

const PID_FILE_NAME: &str = "agent.pid";

/// Get the default agent record path
pub fn default_pid_path() -> PathBuf {
    config::default_config_dir().join(PID_FILE_NAME)
}

/// An agent started by an earlier invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRecord {
    pub pid: u32,
    /// Executable the agent was started from, if known
    pub executable: Option<PathBuf>,
}

impl AgentRecord {
    pub fn new(pid: u32, executable: impl Into<PathBuf>) -> Self {
        Self {
            pid,
            executable: Some(executable.into()),
        }
    }

    /// Load the record at `path`; a missing file is `Ok(None)`
    pub fn load(path: &Path) -> io::Result<Option<Self>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut lines = contents.lines().map(str::trim);
        let pid = lines
            .next()
            .unwrap_or_default()
            .parse::<u32>()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let executable = lines.next().filter(|l| !l.is_empty()).map(PathBuf::from);

        Ok(Some(Self { pid, executable }))
    }

    /// Write the record, creating parent directories
    pub fn store(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut contents = format!("{}\n", self.pid);
        if let Some(executable) = &self.executable {
            contents.push_str(&executable.to_string_lossy());
            contents.push('\n');
        }
        fs::write(path, contents)
    }

    /// Delete the record at `path`; already gone is fine
    pub fn clear(path: &Path) -> io::Result<()> {
        fs::remove_file(path).or_else(|e| match e.kind() {
            io::ErrorKind::NotFound => Ok(()),
            _ => Err(e),
        })
    }

    /// Whether the recorded process still exists
    pub fn is_alive(&self) -> bool {
        is_process_alive(self.pid)
    }
}

/// Check if a process with the given PID is still alive
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // Signal 0 probes without delivering; EPERM still means the PID exists
    unsafe {
        libc::kill(pid, 0) == 0 || io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }
}

#[cfg(windows)]
pub fn is_process_alive(pid: u32) -> bool {
    use windows_sys::Win32::Foundation::CloseHandle;
    use windows_sys::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION};

    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
        if handle == 0 {
            return false;
        }
        CloseHandle(handle);
        true
    }
}
