//! Agent executable resolution

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Find the agent executable.
///
/// An explicit path wins when it names an existing file. Otherwise every
/// directory of `search_path` (the process `PATH` when `None`) is searched
/// for `name`. Returns `None` when nothing matches; never errors.
pub fn resolve_executable(
    explicit: Option<&Path>,
    name: &str,
    search_path: Option<&OsStr>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        tracing::debug!("Configured agent path {:?} does not exist, searching PATH", path);
    }

    let search_path: OsString = match search_path {
        Some(p) => p.to_os_string(),
        None => std::env::var_os("PATH")?,
    };
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    match which::which_in(name, Some(search_path), cwd) {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::debug!("Agent executable '{}' not found on search path: {}", name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_executable(path: &Path) {
        std::fs::write(path, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    #[test]
    fn test_explicit_existing_path_wins() {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join("my-agent");
        make_executable(&exe);

        let empty = TempDir::new().unwrap();
        let resolved = resolve_executable(Some(exe.as_path()), "ngrok", Some(empty.path().as_os_str()));
        assert_eq!(resolved, Some(exe));
    }

    #[test]
    fn test_missing_everywhere_is_none() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let search = std::env::join_paths([a.path(), b.path()]).unwrap();

        let missing = a.path().join("does-not-exist");
        assert_eq!(
            resolve_executable(Some(missing.as_path()), "tk-test-agent", Some(search.as_os_str())),
            None
        );
        assert_eq!(resolve_executable(None, "tk-test-agent", Some(search.as_os_str())), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_found_in_single_search_directory() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let exe = b.path().join("tk-test-agent");
        make_executable(&exe);
        let search = std::env::join_paths([a.path(), b.path()]).unwrap();

        let missing = a.path().join("does-not-exist");
        let resolved = resolve_executable(Some(missing.as_path()), "tk-test-agent", Some(search.as_os_str()));
        assert_eq!(resolved, Some(exe));
    }
}
