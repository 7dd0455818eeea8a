//! Viewer session configuration

use std::time::Duration;

/// Per-viewer session settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Interval between liveness pings on the signaling channel
    pub keepalive_interval: Duration,

    /// Close the session once this many consecutive pings went unanswered
    /// (None = acknowledgements are informational only)
    pub max_missed_pongs: Option<u32>,

    /// Sample duration handed to the media transport with each frame
    pub frame_duration: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keepalive_interval: Duration::from_secs(5),
            max_missed_pongs: None,
            frame_duration: Duration::from_millis(33),
        }
    }
}

impl SessionConfig {
    /// Set the keep-alive interval
    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    /// Treat `max` consecutive unanswered pings as a dead signaling link
    pub fn max_missed_pongs(mut self, max: u32) -> Self {
        self.max_missed_pongs = Some(max.max(1));
        self
    }

    /// Set the per-frame sample duration
    pub fn frame_duration(mut self, duration: Duration) -> Self {
        self.frame_duration = duration;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.keepalive_interval, Duration::from_secs(5));
        assert_eq!(config.max_missed_pongs, None);
        assert_eq!(config.frame_duration, Duration::from_millis(33));
    }

    #[test]
    fn test_builder_chaining() {
        let config = SessionConfig::default()
            .keepalive_interval(Duration::from_secs(1))
            .max_missed_pongs(3)
            .frame_duration(Duration::from_millis(40));

        assert_eq!(config.keepalive_interval, Duration::from_secs(1));
        assert_eq!(config.max_missed_pongs, Some(3));
        assert_eq!(config.frame_duration, Duration::from_millis(40));
    }

    #[test]
    fn test_missed_pongs_at_least_one() {
        let config = SessionConfig::default().max_missed_pongs(0);
        assert_eq!(config.max_missed_pongs, Some(1));
    }
}
