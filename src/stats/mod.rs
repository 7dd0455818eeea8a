//! Statistics

pub mod metrics;

pub use metrics::{ForwardCounters, HubStats, ViewerStats};
