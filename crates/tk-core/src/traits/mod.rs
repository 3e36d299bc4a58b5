//! Core trait definitions

mod agent;
mod api;

pub use agent::{AgentControl, AgentProcess, AgentState};
pub use api::ControlApi;
