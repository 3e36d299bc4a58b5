//! tk-orchestrator: Create or reuse a public tunnel through the agent
//!
//! [`ControlApiClient`] speaks the agent's local JSON API.
//! [`TunnelOrchestrator`] makes sure the agent is running, reconciles the
//! desired tunnel against the agent's current tunnels, creates it when it is
//! missing, and reports failures to an error sink instead of returning them.

pub mod api;
pub mod orchestrator;

pub use api::ControlApiClient;
pub use orchestrator::{StartedTunnels, TunnelOrchestrator};
