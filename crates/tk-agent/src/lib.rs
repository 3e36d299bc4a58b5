//! tk-agent: Lifecycle management for the external tunneling agent
//!
//! Resolves the agent executable, spawns it headless, and terminates the
//! processes it spawned. A name-based sweep over the whole process table is
//! available but must be enabled explicitly in [`AgentConfig`].
//!
//! [`AgentConfig`]: tk_core::config::AgentConfig

mod process;
mod resolve;

pub use process::ProcessController;
pub use resolve::resolve_executable;
