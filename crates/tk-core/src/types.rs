//! Wire types of the agent control API
//!
//! `GET /api/tunnels` returns a [`TunnelList`]; `POST /api/tunnels` takes a
//! [`TunnelCreationRequest`] and answers with a single [`Tunnel`] or an
//! [`ApiErrorDetail`].

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::config::DesiredTunnel;

/// Protocol of a tunnel as reported by the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelProtocol {
    Http,
    Https,
    Tcp,
    Tls,
    #[serde(other)]
    Other,
}

impl fmt::Display for TunnelProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunnelProtocol::Http => write!(f, "http"),
            TunnelProtocol::Https => write!(f, "https"),
            TunnelProtocol::Tcp => write!(f, "tcp"),
            TunnelProtocol::Tls => write!(f, "tls"),
            TunnelProtocol::Other => write!(f, "other"),
        }
    }
}

/// Local side of a tunnel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelAddr {
    pub addr: String,
}

/// A tunnel known to the agent, from either a listing or a creation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tunnel {
    #[serde(default)]
    pub name: Option<String>,
    pub public_url: String,
    pub proto: TunnelProtocol,
    pub config: TunnelAddr,
}

impl Tunnel {
    /// Local address with any URL scheme stripped (`http://localhost:5000` -> `localhost:5000`)
    pub fn local_addr(&self) -> &str {
        strip_scheme(&self.config.addr)
    }

    /// Whether this tunnel forwards to the given `host:port`
    pub fn targets(&self, addr: &str) -> bool {
        self.local_addr() == strip_scheme(addr)
    }
}

fn strip_scheme(addr: &str) -> &str {
    addr.split_once("://").map(|(_, rest)| rest).unwrap_or(addr)
}

/// Body of `GET /api/tunnels`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TunnelList {
    #[serde(default)]
    pub tunnels: Vec<Tunnel>,
}

/// Body of `POST /api/tunnels`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelCreationRequest {
    pub name: String,
    pub addr: String,
    pub proto: TunnelProtocol,
    pub host_header: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
}

impl TunnelCreationRequest {
    /// Build the HTTP tunnel request for a desired tunnel
    pub fn for_desired(desired: &DesiredTunnel) -> Self {
        let addr = desired.local_addr();
        Self {
            name: desired.tunnel_name(),
            host_header: addr.clone(),
            addr,
            proto: TunnelProtocol::Http,
            subdomain: desired.subdomain.clone(),
        }
    }
}

/// Nested diagnostic of an API error
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorDetails {
    #[serde(default)]
    pub err: String,
}

/// Structured error body returned by the control API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default, deserialize_with = "string_or_number")]
    pub error_code: Option<String>,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub details: Option<ApiErrorDetails>,
}

impl ApiErrorDetail {
    /// Parse an error body, returning `None` unless it carries a code or message
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str::<Self>(body)
            .ok()
            .filter(ApiErrorDetail::is_meaningful)
    }

    /// Whether a code or a message is present
    pub fn is_meaningful(&self) -> bool {
        self.error_code.is_some() || !self.msg.is_empty()
    }

    /// Error code, or `?` if the agent omitted it
    pub fn code(&self) -> &str {
        self.error_code.as_deref().unwrap_or("?")
    }

    /// Diagnostic text with escaped newlines turned into real ones
    pub fn display_details(&self) -> String {
        self.details
            .as_ref()
            .map(|d| d.err.replace("\\n", "\n"))
            .unwrap_or_default()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tunnel_listing() {
        let body = r#"{
            "tunnels": [
                {
                    "name": "web (http)",
                    "public_url": "http://abcd1234.ngrok.io",
                    "proto": "http",
                    "config": { "addr": "http://localhost:5000", "inspect": true }
                },
                {
                    "name": "web",
                    "public_url": "https://abcd1234.ngrok.io",
                    "proto": "https",
                    "config": { "addr": "localhost:5000", "inspect": true }
                }
            ],
            "uri": "/api/tunnels"
        }"#;
        let list: TunnelList = serde_json::from_str(body).unwrap();
        assert_eq!(list.tunnels.len(), 2);
        assert_eq!(list.tunnels[0].proto, TunnelProtocol::Http);
        assert!(list.tunnels[0].targets("localhost:5000"));
        assert!(list.tunnels[1].targets("localhost:5000"));
        assert!(!list.tunnels[1].targets("localhost:5001"));
    }

    #[test]
    fn test_unknown_protocol_is_other() {
        let body = r#"{"public_url":"x","proto":"quic","config":{"addr":"localhost:1"}}"#;
        let tunnel: Tunnel = serde_json::from_str(body).unwrap();
        assert_eq!(tunnel.proto, TunnelProtocol::Other);
        assert!(tunnel.name.is_none());
    }

    #[test]
    fn test_creation_request_omits_missing_subdomain() {
        let desired = DesiredTunnel::new(5000);
        let request = TunnelCreationRequest::for_desired(&desired);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["addr"], "localhost:5000");
        assert_eq!(json["host_header"], "localhost:5000");
        assert_eq!(json["proto"], "http");
        assert!(json.get("subdomain").is_none());
    }

    #[test]
    fn test_creation_request_carries_subdomain_and_name() {
        let desired = DesiredTunnel::new(8080)
            .with_subdomain("shop")
            .with_project_name("storefront");
        let request = TunnelCreationRequest::for_desired(&desired);
        assert_eq!(request.subdomain.as_deref(), Some("shop"));
        assert_eq!(request.name, "storefront");
    }

    #[test]
    fn test_error_detail_numeric_code() {
        let detail = ApiErrorDetail::parse(r#"{"error_code":409,"msg":"subdomain in use"}"#).unwrap();
        assert_eq!(detail.code(), "409");
        assert_eq!(detail.msg, "subdomain in use");
        assert_eq!(detail.display_details(), "");
    }

    #[test]
    fn test_error_detail_string_code_and_details() {
        let body = r#"{"error_code":"ERR_NGROK_108","status_code":502,"msg":"session limit","details":{"err":"a\\nb"}}"#;
        let detail = ApiErrorDetail::parse(body).unwrap();
        assert_eq!(detail.code(), "ERR_NGROK_108");
        assert_eq!(detail.display_details(), "a\nb");
    }

    #[test]
    fn test_error_detail_rejects_unrelated_bodies() {
        assert!(ApiErrorDetail::parse("Bad Gateway").is_none());
        assert!(ApiErrorDetail::parse("{}").is_none());
        assert!(ApiErrorDetail::parse(r#"{"status":"down"}"#).is_none());
    }
}
