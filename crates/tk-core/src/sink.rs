//! Error reporting sinks
//!
//! The orchestrator never returns failures as faults. Every terminal failure
//! is handed to an [`ErrorSink`] together with a [`ReportContext`], and the
//! caller gets an absent result instead.

use std::fmt;
use std::sync::Mutex;

/// How serious a reported failure is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Failure taxonomy of one orchestration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    AgentNotFound,
    AgentUnavailable,
    TransientApiFailure,
    StructuredApiError,
    Cancelled,
    UnexpectedFailure,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::AgentNotFound => "agent_not_found",
            FailureKind::AgentUnavailable => "agent_unavailable",
            FailureKind::TransientApiFailure => "transient_api_failure",
            FailureKind::StructuredApiError => "structured_api_error",
            FailureKind::Cancelled => "cancelled",
            FailureKind::UnexpectedFailure => "unexpected_failure",
        };
        f.write_str(name)
    }
}

/// Where a failure happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportContext {
    pub kind: FailureKind,
    /// Desired local address of the run
    pub local_addr: String,
    /// Tunnel name of the run
    pub tunnel_name: String,
}

/// A single report captured by [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub severity: Severity,
    pub message: String,
    pub context: ReportContext,
}

/// Receiver of caller-visible failure reports
pub trait ErrorSink: Send + Sync {
    /// Record a failure
    fn report(&self, severity: Severity, message: &str, context: &ReportContext);
}

/// Sink that writes reports to the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, severity: Severity, message: &str, context: &ReportContext) {
        match severity {
            Severity::Critical | Severity::Error => tracing::error!(
                kind = %context.kind,
                addr = %context.local_addr,
                severity = %severity,
                "{}",
                message
            ),
            Severity::Warning => {
                tracing::warn!(kind = %context.kind, addr = %context.local_addr, "{}", message)
            }
            Severity::Info => {
                tracing::info!(kind = %context.kind, addr = %context.local_addr, "{}", message)
            }
        }
    }
}

/// Sink that keeps every report in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<ErrorReport>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far
    pub fn reports(&self) -> Vec<ErrorReport> {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of reports recorded
    pub fn len(&self) -> usize {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorSink for MemorySink {
    fn report(&self, severity: Severity, message: &str, context: &ReportContext) {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(ErrorReport {
                severity,
                message: message.to_string(),
                context: context.clone(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(kind: FailureKind) -> ReportContext {
        ReportContext {
            kind,
            local_addr: "localhost:5000".to_string(),
            tunnel_name: "localhost-5000".to_string(),
        }
    }

    #[test]
    fn test_memory_sink_collects_reports() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.report(Severity::Error, "first", &context(FailureKind::AgentNotFound));
        sink.report(
            Severity::Critical,
            "second",
            &context(FailureKind::UnexpectedFailure),
        );

        let reports = sink.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].message, "first");
        assert_eq!(reports[1].severity, Severity::Critical);
        assert_eq!(reports[1].context.kind, FailureKind::UnexpectedFailure);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Error);
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::AgentUnavailable.to_string(), "agent_unavailable");
        assert_eq!(FailureKind::StructuredApiError.to_string(), "structured_api_error");
    }

    #[test]
    fn test_tracing_sink_does_not_panic() {
        TracingSink.report(Severity::Warning, "warn", &context(FailureKind::Cancelled));
    }
}
