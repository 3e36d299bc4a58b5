//! Output formatting utilities for the CLI
//!
//! Tables for tunnel listings, the status summary, colored status
//! messages, and the console error sink used by `tunnelkit start`.

use std::path::PathBuf;

use tabled::{
    settings::{Style, Width},
    Table, Tabled,
};

use tk_core::{ErrorSink, ReportContext, Severity, Tunnel};

/// Format a list of tunnels as an ASCII table
///
/// The detailed view adds the tunnel name and the address exactly as the
/// agent reported it.
pub fn format_tunnels(tunnels: &[Tunnel], detailed: bool) -> String {
    if tunnels.is_empty() {
        return "No tunnels".to_string();
    }

    #[derive(Tabled)]
    struct TunnelRow {
        #[tabled(rename = "PUBLIC URL")]
        public_url: String,
        #[tabled(rename = "PROTO")]
        proto: String,
        #[tabled(rename = "LOCAL ADDR")]
        local_addr: String,
    }

    #[derive(Tabled)]
    struct TunnelRowDetailed {
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "PUBLIC URL")]
        public_url: String,
        #[tabled(rename = "PROTO")]
        proto: String,
        #[tabled(rename = "LOCAL ADDR")]
        local_addr: String,
        #[tabled(rename = "REPORTED ADDR")]
        reported_addr: String,
    }

    if detailed {
        let rows: Vec<TunnelRowDetailed> = tunnels
            .iter()
            .map(|t| TunnelRowDetailed {
                name: t.name.clone().unwrap_or_else(|| "-".to_string()),
                public_url: t.public_url.clone(),
                proto: t.proto.to_string(),
                local_addr: t.local_addr().to_string(),
                reported_addr: t.config.addr.clone(),
            })
            .collect();

        Table::new(rows)
            .with(Style::rounded())
            .with(Width::wrap(120))
            .to_string()
    } else {
        let rows: Vec<TunnelRow> = tunnels
            .iter()
            .map(|t| TunnelRow {
                public_url: t.public_url.clone(),
                proto: t.proto.to_string(),
                local_addr: t.local_addr().to_string(),
            })
            .collect();

        Table::new(rows).with(Style::rounded()).to_string()
    }
}

/// What `tunnelkit status` found out about the agent
#[derive(Debug, Clone)]
pub struct AgentStatus {
    pub installed: bool,
    pub executable: Option<PathBuf>,
    /// Agent recorded in the PID file and still alive
    pub recorded_pid: Option<u32>,
    pub api_url: String,
    /// Tunnel count, or `None` if the control API did not answer
    pub tunnels: Option<usize>,
}

/// Format agent status as a human-readable string
pub fn format_status(status: &AgentStatus) -> String {
    let mut lines = Vec::new();

    lines.push("Agent".to_string());
    lines.push(format!(
        "  Installed:    {}",
        match &status.executable {
            Some(path) if status.installed => format!("yes ({})", path.display()),
            _ => "no".to_string(),
        }
    ));
    lines.push(format!(
        "  Started by tunnelkit: {}",
        status
            .recorded_pid
            .map(|pid| format!("yes (PID {})", pid))
            .unwrap_or_else(|| "no".to_string())
    ));

    lines.push(String::new());
    lines.push("Control API".to_string());
    lines.push(format!("  Address:      {}", status.api_url));
    lines.push(format!(
        "  Reachable:    {}",
        if status.tunnels.is_some() { "yes" } else { "no" }
    ));
    if let Some(count) = status.tunnels {
        lines.push(format!("  Tunnels:      {}", count));
    }

    lines.join("\n")
}

/// Print a success message in green with a checkmark prefix
///
/// Outputs to stdout with green coloring for positive feedback to the user.
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
///
/// Outputs to stderr with red coloring for error feedback to the user.
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow with a warning symbol prefix
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan with an info symbol prefix
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Error sink that prints reports to the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ErrorSink for ConsoleSink {
    fn report(&self, severity: Severity, message: &str, context: &ReportContext) {
        tracing::debug!(kind = %context.kind, addr = %context.local_addr, %severity, "Reported failure");
        match severity {
            Severity::Critical | Severity::Error => print_error(message),
            Severity::Warning => print_warning(message),
            Severity::Info => print_info(message),
        }
    }
}
