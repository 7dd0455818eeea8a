//! Statistics for the hub and viewer sessions

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Hub-wide statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Currently registered subscribers
    pub subscribers: usize,
    /// Frames dispatched since the hub started
    pub frames_broadcast: u64,
    /// Subscribers evicted for falling behind
    pub evicted: u64,
}

/// Per-viewer statistics
#[derive(Debug, Clone)]
pub struct ViewerStats {
    /// When the session started
    pub started_at: Instant,
    /// Frames taken from the viewer's intake
    pub frames_received: u64,
    /// Frames handed to the media transport
    pub frames_forwarded: u64,
    /// Frames dropped while waiting for a keyframe
    pub frames_gated: u64,
    /// Frames that failed classification
    pub frames_invalid: u64,
    /// Empty and show-existing frames skipped
    pub frames_skipped: u64,
    /// Bytes handed to the media transport
    pub bytes_forwarded: u64,
    /// Subscriptions taken over the session's lifetime
    pub subscriptions: u32,
}

impl Default for ViewerStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            frames_received: 0,
            frames_forwarded: 0,
            frames_gated: 0,
            frames_invalid: 0,
            frames_skipped: 0,
            bytes_forwarded: 0,
            subscriptions: 0,
        }
    }

    /// Time since the session started
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Forwarding bitrate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.duration().as_secs();
        if secs > 0 {
            (self.bytes_forwarded * 8) / secs
        } else {
            0
        }
    }

    /// Number of reconnects (subscriptions after the first)
    pub fn reconnects(&self) -> u32 {
        self.subscriptions.saturating_sub(1)
    }
}

/// Frame counters written by a viewer's forwarding tasks
///
/// Shared by every subscription of one session, so the totals survive a
/// forwarding task being cancelled on disconnect.
#[derive(Debug, Default)]
pub struct ForwardCounters {
    pub frames_received: AtomicU64,
    pub frames_forwarded: AtomicU64,
    pub frames_gated: AtomicU64,
    pub frames_invalid: AtomicU64,
    pub frames_skipped: AtomicU64,
    pub bytes_forwarded: AtomicU64,
}

impl ForwardCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bump one counter
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Copy the current totals into `stats`
    pub fn fill(&self, stats: &mut ViewerStats) {
        stats.frames_received = self.frames_received.load(Ordering::Relaxed);
        stats.frames_forwarded = self.frames_forwarded.load(Ordering::Relaxed);
        stats.frames_gated = self.frames_gated.load(Ordering::Relaxed);
        stats.frames_invalid = self.frames_invalid.load(Ordering::Relaxed);
        stats.frames_skipped = self.frames_skipped.load(Ordering::Relaxed);
        stats.bytes_forwarded = self.bytes_forwarded.load(Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_stats_defaults() {
        let stats = ViewerStats::new();
        assert_eq!(stats.frames_forwarded, 0);
        assert_eq!(stats.bitrate(), 0);
        assert_eq!(stats.reconnects(), 0);
    }

    #[test]
    fn test_reconnects() {
        let mut stats = ViewerStats::new();
        stats.subscriptions = 3;
        assert_eq!(stats.reconnects(), 2);
    }

    #[test]
    fn test_forward_counters_fill() {
        let counters = ForwardCounters::new();
        ForwardCounters::add(&counters.frames_forwarded, 2);
        ForwardCounters::add(&counters.bytes_forwarded, 1500);
        ForwardCounters::add(&counters.frames_gated, 1);

        let mut stats = ViewerStats::new();
        stats.subscriptions = 1;
        counters.fill(&mut stats);

        assert_eq!(stats.frames_forwarded, 2);
        assert_eq!(stats.bytes_forwarded, 1500);
        assert_eq!(stats.frames_gated, 1);
        assert_eq!(stats.subscriptions, 1);
    }

    #[test]
    fn test_hub_stats_default() {
        let stats = HubStats::default();
        assert_eq!(stats.subscribers, 0);
        assert_eq!(stats.frames_broadcast, 0);
        assert_eq!(stats.evicted, 0);
    }
}
