//! lanhub-core — configuration and the line protocol shared by the daemon
//! and the client.

pub mod config;
pub mod protocol;

pub use config::{ConfigError, HubConfig};
pub use protocol::Command;
