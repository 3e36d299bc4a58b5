//! Core error types for tunnelkit

use std::path::PathBuf;
use thiserror::Error;

use crate::sink::{FailureKind, Severity};
use crate::types::ApiErrorDetail;

/// The only text shown to users when the agent executable cannot be launched
pub const AGENT_NOT_FOUND_MESSAGE: &str = "ngrok executable not found. Configure the path in the settings or add the location to your PATH.";

/// Errors raised while launching the agent process
#[derive(Error, Debug)]
pub enum LaunchError {
    /// Executable could not be resolved from the explicit path or the search path
    #[error("Agent executable '{name}' not found")]
    NotFound { name: String },

    /// The OS refused to run the executable
    #[error("Permission denied launching {path:?}: {source}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other spawn failure
    #[error("Failed to spawn {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LaunchError {
    /// Map a spawn error onto the launch taxonomy
    pub fn from_spawn(path: PathBuf, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => LaunchError::NotFound {
                name: path.display().to_string(),
            },
            std::io::ErrorKind::PermissionDenied => LaunchError::PermissionDenied { path, source: err },
            _ => LaunchError::Spawn { path, source: err },
        }
    }
}

/// Errors returned by the agent control API client
#[derive(Error, Debug)]
pub enum ApiError {
    /// Nothing is listening on the control endpoint (or the connection dropped)
    #[error("Control API unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// Request failed for another transport reason (timeout, protocol error)
    #[error("Control API request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// Non-success status with a body that is not a structured error
    #[error("Control API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Non-success status with a structured error body
    #[error("Control API returned {status}: [{}] {}", .detail.code(), .detail.msg)]
    Structured { status: u16, detail: ApiErrorDetail },

    /// Body could not be decoded into the expected shape
    #[error("Malformed control API response: {source} (body: {body})")]
    MalformedResponse {
        body: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Classify a reqwest transport error
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() {
            ApiError::Unreachable(err)
        } else {
            ApiError::Request(err)
        }
    }

    /// Whether a single retry is worth attempting
    ///
    /// Structured errors describe a semantic problem (session limits, taken
    /// subdomains) and undecodable success bodies will not improve on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::Unreachable(_) | ApiError::Request(_) | ApiError::Status { .. }
        )
    }

    /// Whether the request failed below HTTP (no status was received)
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Unreachable(_) | ApiError::Request(_))
    }

    /// Raw text of the failure, used in terminal reports
    pub fn raw_text(&self) -> String {
        match self {
            ApiError::Status { body, .. } => body.clone(),
            ApiError::MalformedResponse { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

/// Failures of one orchestration run
#[derive(Error, Debug)]
pub enum TunnelError {
    /// Executable missing or refused by the OS
    #[error("{}", AGENT_NOT_FOUND_MESSAGE)]
    AgentNotFound(#[source] LaunchError),

    /// Control API never became reachable after the warm-up window
    #[error("Cannot start the tunnel agent: control API is not responding ({0})")]
    AgentUnavailable(#[source] ApiError),

    /// Unstructured creation failure that persisted through the retry
    #[error("Could not create tunnel for {name} ({addr}): \n{body}")]
    TransientApiFailure {
        name: String,
        addr: String,
        body: String,
    },

    /// Structured error reported by the control API
    #[error("Could not create tunnel for {name} ({addr}): \n[{}] {}\nDetails: {}", .detail.code(), .detail.msg, .detail.display_details())]
    StructuredApiError {
        name: String,
        addr: String,
        detail: ApiErrorDetail,
    },

    /// The caller cancelled the run
    #[error("Tunnel start cancelled")]
    Cancelled,

    /// Anything else
    #[error("Ran into a problem trying to start the tunnel(s): {0}")]
    Unexpected(String),
}

impl TunnelError {
    /// Taxonomy bucket for this error
    pub fn kind(&self) -> FailureKind {
        match self {
            TunnelError::AgentNotFound(_) => FailureKind::AgentNotFound,
            TunnelError::AgentUnavailable(_) => FailureKind::AgentUnavailable,
            TunnelError::TransientApiFailure { .. } => FailureKind::TransientApiFailure,
            TunnelError::StructuredApiError { .. } => FailureKind::StructuredApiError,
            TunnelError::Cancelled => FailureKind::Cancelled,
            TunnelError::Unexpected(_) => FailureKind::UnexpectedFailure,
        }
    }

    /// Severity used when the error is routed to a sink
    pub fn severity(&self) -> Severity {
        match self {
            TunnelError::Unexpected(_) => Severity::Critical,
            TunnelError::Cancelled => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ApiErrorDetails;

    #[test]
    fn test_agent_not_found_uses_fixed_message() {
        let err = TunnelError::AgentNotFound(LaunchError::NotFound {
            name: "ngrok".to_string(),
        });
        assert_eq!(err.to_string(), AGENT_NOT_FOUND_MESSAGE);
        assert_eq!(err.kind(), FailureKind::AgentNotFound);
    }

    #[test]
    fn test_launch_error_mapping() {
        let err = LaunchError::from_spawn(
            PathBuf::from("/nope/ngrok"),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(matches!(err, LaunchError::NotFound { .. }));

        let err = LaunchError::from_spawn(
            PathBuf::from("/etc/passwd"),
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, LaunchError::PermissionDenied { .. }));
    }

    #[test]
    fn test_structured_error_display_normalizes_newlines() {
        let err = TunnelError::StructuredApiError {
            name: "shop".to_string(),
            addr: "localhost:5000".to_string(),
            detail: ApiErrorDetail {
                error_code: Some("102".to_string()),
                msg: "invalid tunnel configuration".to_string(),
                details: Some(ApiErrorDetails {
                    err: "line one\\nline two".to_string(),
                }),
            },
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Could not create tunnel for shop (localhost:5000): \n"));
        assert!(msg.contains("[102] invalid tunnel configuration"));
        assert!(msg.contains("Details: line one\nline two"));
        assert_eq!(err.severity(), Severity::Error);
    }

    #[test]
    fn test_transient_classification() {
        let status = ApiError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert!(status.is_transient());
        assert!(!status.is_transport());
        assert_eq!(status.raw_text(), "bad gateway");

        let structured = ApiError::Structured {
            status: 400,
            detail: ApiErrorDetail {
                error_code: Some("409".to_string()),
                msg: "subdomain in use".to_string(),
                details: None,
            },
        };
        assert!(!structured.is_transient());
    }

    #[test]
    fn test_unexpected_is_critical() {
        let err = TunnelError::Unexpected("boom".to_string());
        assert_eq!(err.severity(), Severity::Critical);
        assert_eq!(err.kind(), FailureKind::UnexpectedFailure);
    }
}
