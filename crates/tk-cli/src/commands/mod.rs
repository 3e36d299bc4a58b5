//! CLI command implementations

mod config;
mod list;
mod start;
mod status;
mod stop;

pub use config::{config_init, config_show};
pub use list::list_command;
pub use start::{start_command, StartOptions};
pub use status::status_command;
pub use stop::stop_command;
