//! Keyframe gating
//!
//! A viewer that joins mid-stream cannot decode from an inter frame. The gate
//! drops everything until the first keyframe of its subscription and then
//! lets every decodable frame through in order.

use crate::error::FrameError;
use crate::hub::Frame;
use crate::media::FrameKind;

/// What to do with one frame taken from the intake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Hand the frame to the media transport. `opened` is set for the
    /// keyframe that opened the gate.
    Forward { kind: FrameKind, opened: bool },
    /// Dropped while waiting for a keyframe
    Gated,
    /// Empty or show-existing frame, nothing to send
    Skipped,
    /// Frame failed classification
    Invalid(FrameError),
}

impl Admission {
    pub fn is_forward(&self) -> bool {
        matches!(self, Admission::Forward { .. })
    }
}

/// Gating state for one subscription
///
/// Created closed with every new subscription, so a reconnecting viewer
/// always waits for a fresh keyframe.
#[derive(Debug, Default)]
pub struct KeyframeGate {
    streaming: bool,
}

impl KeyframeGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a keyframe has been seen on this subscription
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Decide whether `frame` is forwarded
    pub fn admit(&mut self, frame: &Frame) -> Admission {
        if frame.is_empty() {
            return Admission::Skipped;
        }

        let kind = match frame.classify() {
            Ok(FrameKind::ShowExisting) => return Admission::Skipped,
            Ok(kind) => kind,
            Err(e) => return Admission::Invalid(e),
        };

        let opened = !self.streaming && kind.is_keyframe();
        if opened {
            self.streaming = true;
        }

        if self.streaming {
            Admission::Forward { kind, opened }
        } else {
            Admission::Gated
        }
    }
}
