//! Signaling server and relay configuration

pub mod config;
pub mod listener;

pub use config::{NetworkType, RelayConfig};
pub use listener::RelayServer;
