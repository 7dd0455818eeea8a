//! Viewer session management
//!
//! Each viewer runs a [`ViewerSession`] for the signaling exchange and
//! connectivity handling. While the viewer is connected, a forwarding task
//! per subscription passes hub frames through the keyframe gate to the
//! viewer's video track.

pub mod config;
pub mod context;
pub mod forward;
pub mod gate;
pub mod state;
pub mod viewer;

pub use config::SessionConfig;
pub use context::ViewerContext;
pub use forward::ForwardEnd;
pub use gate::{Admission, KeyframeGate};
pub use state::{ViewerPhase, ViewerState};
pub use viewer::{SessionEnd, SessionSummary, ViewerSession};
