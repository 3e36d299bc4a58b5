//! Desired tunnel configuration

use serde::{Deserialize, Serialize};

use super::serde_utils::empty_string_as_none;

fn default_host() -> String {
    "localhost".to_string()
}

/// The tunnel a caller wants: which local port, and optional naming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredTunnel {
    /// Local port of the web application
    pub port: u16,

    /// Local host of the web application
    #[serde(default = "default_host")]
    pub host: String,

    /// Requested public subdomain
    #[serde(
        default,
        with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub subdomain: Option<String>,

    /// Project name used to label the tunnel
    #[serde(
        default,
        with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub project_name: Option<String>,
}

impl DesiredTunnel {
    /// Tunnel to `localhost:<port>` with no subdomain or project name
    pub fn new(port: u16) -> Self {
        Self {
            port,
            host: default_host(),
            subdomain: None,
            project_name: None,
        }
    }

    /// Set the subdomain; blank values leave it unset
    pub fn with_subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = non_blank(subdomain.into());
        self
    }

    /// Set the project name; blank values leave it unset
    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = non_blank(name.into());
        self
    }

    /// The desired address, `host:port`
    pub fn local_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Name sent with the creation request
    pub fn tunnel_name(&self) -> String {
        self.project_name
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.host, self.port))
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_addr() {
        assert_eq!(DesiredTunnel::new(5000).local_addr(), "localhost:5000");
    }

    #[test]
    fn test_blank_values_stay_unset() {
        let desired = DesiredTunnel::new(5000)
            .with_subdomain("")
            .with_project_name("   ");
        assert_eq!(desired.subdomain, None);
        assert_eq!(desired.project_name, None);
        assert_eq!(desired.tunnel_name(), "localhost-5000");
    }

    #[test]
    fn test_project_name_is_tunnel_name() {
        let desired = DesiredTunnel::new(5000).with_project_name("storefront");
        assert_eq!(desired.tunnel_name(), "storefront");
    }
}
