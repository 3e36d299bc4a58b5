//! tk-core: Core abstractions and configuration for tunnelkit
//!
//! This crate provides the wire types of the agent control API, the
//! configuration structures, the error taxonomy and the error sink used by
//! the process controller, the orchestrator and the CLI.

pub mod config;
pub mod error;
pub mod pidfile;
pub mod sink;
pub mod traits;
pub mod types;

pub use error::{ApiError, ConfigError, LaunchError, TunnelError, AGENT_NOT_FOUND_MESSAGE};
pub use sink::{ErrorReport, ErrorSink, FailureKind, MemorySink, ReportContext, Severity, TracingSink};
pub use types::{ApiErrorDetail, Tunnel, TunnelCreationRequest, TunnelProtocol};
