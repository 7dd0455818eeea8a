//! Media handling
//!
//! This module provides:
//! - VP9 keyframe classification
//! - IVF container reading
//! - The frame source abstraction feeding the ingest loop

pub mod ivf;
pub mod source;
pub mod vp9;

pub use ivf::{IvfHeader, IvfReader};
pub use source::FrameSource;
pub use vp9::{classify, FrameKind};
