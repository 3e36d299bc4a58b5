//! Configuration management for tunnelkit

mod agent;
pub mod serde_utils;
mod tunnel;

pub use agent::AgentConfig;
pub use tunnel::DesiredTunnel;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level layout of `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// How to find, launch and talk to the agent
    pub agent: AgentConfig,

    /// Default tunnel used when the CLI is not given a port
    pub tunnel: Option<DesiredTunnel>,
}

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tunnelkit")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Load the config file at `path` (or the default path), falling back to defaults when absent
pub fn load_or_default(path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let default_path = default_config_path();
    let path = path.unwrap_or(&default_path);
    match load_config(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::NotFound(p)) => {
            tracing::debug!("Config file {:?} not found, using defaults", p);
            Ok(ConfigFile::default())
        }
        Err(e) => Err(e),
    }
}

/// Save configuration to a file
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let result: Result<ConfigFile, _> = load_config(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_when_missing() {
        let dir = TempDir::new().unwrap();
        let config = load_or_default(Some(&dir.path().join("missing.toml"))).unwrap();
        assert_eq!(config.agent.executable_name, "ngrok");
        assert!(config.tunnel.is_none());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[agent\nexecutable_name = ").unwrap();
        assert!(matches!(
            load_or_default(Some(&path)),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_full_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[agent]
executable_path = "/opt/ngrok/ngrok"
api_address = "127.0.0.1:4041"
warmup_delay = 500
retry_delay = 2000
request_timeout = 5
sweep_by_name = true

[tunnel]
port = 5000
subdomain = ""
project_name = "storefront"
"#,
        )
        .unwrap();

        let config: ConfigFile = load_config(&path).unwrap();
        assert_eq!(
            config.agent.executable_path,
            Some(PathBuf::from("/opt/ngrok/ngrok"))
        );
        assert_eq!(config.agent.api_base_url(), "http://127.0.0.1:4041");
        assert_eq!(config.agent.warmup_delay, Duration::from_millis(500));
        assert_eq!(config.agent.retry_delay, Duration::from_millis(2000));
        assert_eq!(config.agent.request_timeout, Duration::from_secs(5));
        assert!(config.agent.sweep_by_name);

        let tunnel = config.tunnel.unwrap();
        assert_eq!(tunnel.port, 5000);
        assert_eq!(tunnel.host, "localhost");
        assert_eq!(tunnel.subdomain, None);
        assert_eq!(tunnel.project_name.as_deref(), Some("storefront"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = ConfigFile {
            agent: AgentConfig::default(),
            tunnel: Some(DesiredTunnel::new(3000).with_subdomain("demo")),
        };
        save_config(&path, &config).unwrap();

        let loaded: ConfigFile = load_config(&path).unwrap();
        let tunnel = loaded.tunnel.unwrap();
        assert_eq!(tunnel.port, 3000);
        assert_eq!(tunnel.subdomain.as_deref(), Some("demo"));
    }
}
