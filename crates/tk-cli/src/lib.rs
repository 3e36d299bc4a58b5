//! tk-cli: Command-line interface for tunnelkit
//!
//! Provides the `tunnelkit` CLI for starting, listing and stopping
//! tunnels through a locally running agent.

pub mod commands;
pub mod output;
