//! Control API traits

use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{Tunnel, TunnelCreationRequest};

/// The agent's local control API
#[async_trait]
pub trait ControlApi: Send + Sync {
    /// Fetch a fresh snapshot of the agent's tunnels
    async fn list_tunnels(&self) -> Result<Vec<Tunnel>, ApiError>;

    /// Ask the agent to open a tunnel
    async fn create_tunnel(&self, request: &TunnelCreationRequest) -> Result<Tunnel, ApiError>;
}
