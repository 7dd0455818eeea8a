//! Frames carried through the hub
//!
//! A [`Frame`] is one encoded video access unit. It is produced once by the
//! ingest loop and shared read-only with every subscriber.

use bytes::Bytes;

use crate::error::FrameError;
use crate::media::vp9::{self, FrameKind};

/// One encoded video frame
///
/// Cheap to clone: `Bytes` is reference counted, so every subscriber shares
/// the same allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Presentation timestamp in source timebase units
    pub timestamp: u64,
    /// Encoded frame data
    pub data: Bytes,
}

impl Frame {
    /// Create a frame
    pub fn new(timestamp: u64, data: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            data: data.into(),
        }
    }

    /// Whether the frame carries no data
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Classify the frame as key/delta
    pub fn classify(&self) -> Result<FrameKind, FrameError> {
        vp9::classify(&self.data)
    }
}
