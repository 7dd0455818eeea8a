//! VP9 frame classification
//!
//! Only the first byte of the uncompressed frame header is inspected:
//!
//! ```text
//!   7   6   5   4   3   2   1   0
//! +-------+---+---+---+---+---+---+
//! | marker| pl| ph| s | t | . | . |   profile 0..2
//! +-------+---+---+---+---+---+---+
//! | marker| 1 | 1 | r | s | t | . |   profile 3 (reserved_zero bit shifts the rest)
//! +-------+---+---+---+---+---+---+
//! ```
//!
//! `marker` is the 2-bit frame marker (always `0b10`), `pl`/`ph` the profile
//! bits, `s` show_existing_frame and `t` frame_type (0 = key, 1 = inter).

use crate::error::FrameError;

/// Minimum number of bytes needed to classify a frame
pub const MIN_HEADER_SIZE: usize = 1;

const FRAME_MARKER_MASK: u8 = 0b1100_0000;
const FRAME_MARKER: u8 = 0b1000_0000;
const PROFILE_MASK: u8 = 0b0011_0000;

/// Result of classifying one encoded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Self-contained frame, a valid decode starting point
    Key,
    /// Inter frame, needs previously decoded frames
    Delta,
    /// show_existing_frame is set: repeats an already decoded frame
    ShowExisting,
}

impl FrameKind {
    pub fn is_keyframe(&self) -> bool {
        matches!(self, FrameKind::Key)
    }
}

/// Classify a VP9 frame from its leading header byte
pub fn classify(frame: &[u8]) -> Result<FrameKind, FrameError> {
    let Some(&b) = frame.first() else {
        return Err(FrameError::Malformed {
            len: frame.len(),
            min: MIN_HEADER_SIZE,
        });
    };

    if b & FRAME_MARKER_MASK != FRAME_MARKER {
        return Err(FrameError::NotExpectedCodec { marker: b >> 6 });
    }

    let (show_existing, frame_type) = if b & PROFILE_MASK == PROFILE_MASK {
        (b & 0b0000_0100, b & 0b0000_0010)
    } else {
        (b & 0b0000_1000, b & 0b0000_0100)
    };

    if show_existing != 0 {
        return Ok(FrameKind::ShowExisting);
    }

    if frame_type == 0 {
        Ok(FrameKind::Key)
    } else {
        Ok(FrameKind::Delta)
    }
}

/// Profile number (0-3) of a VP9 frame
pub fn profile(frame: &[u8]) -> Option<u8> {
    let b = *frame.first()?;
    if b & FRAME_MARKER_MASK != FRAME_MARKER {
        return None;
    }
    // profile_low_bit is transmitted first
    let low = (b >> 5) & 1;
    let high = (b >> 4) & 1;
    Some((high << 1) | low)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyframe() {
        assert_eq!(classify(&[0b1000_0000]), Ok(FrameKind::Key));
        assert_eq!(classify(&[0x82, 0x49, 0x83, 0x42]), Ok(FrameKind::Key));
    }

    #[test]
    fn test_delta_frame() {
        assert_eq!(classify(&[0b1000_0100]), Ok(FrameKind::Delta));
        assert_eq!(classify(&[0x86, 0x00]), Ok(FrameKind::Delta));
    }

    #[test]
    fn test_show_existing_frame() {
        assert_eq!(classify(&[0b1000_1000]), Ok(FrameKind::ShowExisting));
        // frame_type bit is meaningless here
        assert_eq!(classify(&[0b1000_1100]), Ok(FrameKind::ShowExisting));
    }

    #[test]
    fn test_profile_3_shifts_fields() {
        assert_eq!(classify(&[0b1011_0000]), Ok(FrameKind::Key));
        assert_eq!(classify(&[0b1011_0010]), Ok(FrameKind::Delta));
        assert_eq!(classify(&[0b1011_0100]), Ok(FrameKind::ShowExisting));
        // bit 3 is reserved_zero in profile 3, not show_existing
        assert_eq!(classify(&[0b1011_1000]), Ok(FrameKind::Key));
    }

    #[test]
    fn test_profiles_1_and_2_unshifted() {
        assert_eq!(classify(&[0b1010_0100]), Ok(FrameKind::Delta));
        assert_eq!(classify(&[0b1001_0000]), Ok(FrameKind::Key));
    }

    #[test]
    fn test_not_vp9() {
        for b in [0x00u8, 0x40, 0xC0, 0x17, 0xFF] {
            assert_eq!(
                classify(&[b]),
                Err(FrameError::NotExpectedCodec { marker: b >> 6 })
            );
        }
    }

    #[test]
    fn test_empty_is_malformed() {
        assert_eq!(
            classify(&[]),
            Err(FrameError::Malformed { len: 0, min: 1 })
        );
    }

    #[test]
    fn test_profile() {
        assert_eq!(profile(&[0b1000_0000]), Some(0));
        assert_eq!(profile(&[0b1010_0000]), Some(1));
        assert_eq!(profile(&[0b1001_0000]), Some(2));
        assert_eq!(profile(&[0b1011_0000]), Some(3));
        assert_eq!(profile(&[0x00]), None);
        assert_eq!(profile(&[]), None);
    }

    #[test]
    fn test_is_keyframe() {
        assert!(FrameKind::Key.is_keyframe());
        assert!(!FrameKind::Delta.is_keyframe());
        assert!(!FrameKind::ShowExisting.is_keyframe());
    }
}
