//! Viewer state machine
//!
//! Tracks one viewer from the first offer until the session ends:
//!
//! ```text
//! Idle ─offer─► Negotiating ─connected─► Connected(streaming=false)
//!                    ▲                          │ keyframe
//!                    │                          ▼
//!                    │                  Connected(streaming=true)
//!                    │                          │ disconnected / send failure
//!                    └──────offer────── Disconnected ◄─┘
//!                                         │ connected: fresh subscription
//!                                         ▼
//!                             Connected(streaming=false)
//!
//! any state ─signaling closed / fatal error─► Closed
//! ```

use std::time::Instant;

use crate::transport::ConnectivityState;

/// Viewer lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerPhase {
    /// Signaling open, no offer yet
    Idle,
    /// Offer received, answer produced or in progress
    Negotiating,
    /// Subscribed to the hub
    Connected { streaming: bool },
    /// Transport dropped; waiting for it to come back
    Disconnected,
    /// Session over
    Closed,
}

/// Per-viewer state
#[derive(Debug)]
pub struct ViewerState {
    /// Current phase
    pub phase: ViewerPhase,

    /// Last connectivity state reported by the media transport
    pub connectivity: ConnectivityState,

    /// Offers handled in this session
    pub negotiations: u32,

    /// Times the viewer went from disconnected back to connected
    pub reconnects: u32,

    /// Session start time
    pub started_at: Instant,

    /// When the current subscription began
    pub subscribed_at: Option<Instant>,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerState {
    pub fn new() -> Self {
        Self {
            phase: ViewerPhase::Idle,
            connectivity: ConnectivityState::New,
            negotiations: 0,
            reconnects: 0,
            started_at: Instant::now(),
            subscribed_at: None,
        }
    }

    /// An offer arrived
    pub fn on_offer(&mut self) {
        match self.phase {
            ViewerPhase::Idle | ViewerPhase::Disconnected | ViewerPhase::Negotiating => {
                self.phase = ViewerPhase::Negotiating;
            }
            // Renegotiation on a live connection keeps the subscription
            ViewerPhase::Connected { .. } | ViewerPhase::Closed => {}
        }
        if !self.is_closed() {
            self.negotiations += 1;
        }
    }

    /// The transport reported a connectivity change
    pub fn on_connectivity(&mut self, state: ConnectivityState) {
        self.connectivity = state;
    }

    /// A fresh subscription was taken; gating starts over
    pub fn on_subscribed(&mut self) {
        if self.is_closed() {
            return;
        }
        if self.phase == ViewerPhase::Disconnected {
            self.reconnects += 1;
        }
        self.phase = ViewerPhase::Connected { streaming: false };
        self.subscribed_at = Some(Instant::now());
    }

    /// The first keyframe of the subscription was forwarded
    pub fn on_keyframe(&mut self) {
        if let ViewerPhase::Connected { streaming: false } = self.phase {
            self.phase = ViewerPhase::Connected { streaming: true };
        }
    }

    /// The subscription was released
    pub fn on_unsubscribed(&mut self) {
        if let ViewerPhase::Connected { .. } = self.phase {
            self.phase = ViewerPhase::Disconnected;
        }
        self.subscribed_at = None;
    }

    /// End the session
    pub fn close(&mut self) {
        self.phase = ViewerPhase::Closed;
        self.subscribed_at = None;
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.phase, ViewerPhase::Connected { streaming: true })
    }

    pub fn is_closed(&self) -> bool {
        self.phase == ViewerPhase::Closed
    }

    /// Session duration
    pub fn duration(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_lifecycle() {
        let mut state = ViewerState::new();
        assert_eq!(state.phase, ViewerPhase::Idle);

        state.on_offer();
        assert_eq!(state.phase, ViewerPhase::Negotiating);
        assert_eq!(state.negotiations, 1);

        state.on_connectivity(ConnectivityState::Connected);
        state.on_subscribed();
        assert_eq!(state.phase, ViewerPhase::Connected { streaming: false });
        assert!(state.subscribed_at.is_some());

        state.on_keyframe();
        assert!(state.is_streaming());

        state.on_unsubscribed();
        assert_eq!(state.phase, ViewerPhase::Disconnected);
        assert!(state.subscribed_at.is_none());

        state.close();
        assert!(state.is_closed());
    }

    #[test]
    fn test_reconnect_resets_streaming() {
        let mut state = ViewerState::new();
        state.on_offer();
        state.on_subscribed();
        state.on_keyframe();
        state.on_unsubscribed();

        state.on_subscribed();
        assert_eq!(state.phase, ViewerPhase::Connected { streaming: false });
        assert_eq!(state.reconnects, 1);

        for _ in 0..5 {
            state.on_unsubscribed();
            state.on_subscribed();
        }
        assert_eq!(state.reconnects, 6);
    }

    #[test]
    fn test_keyframe_ignored_when_not_connected() {
        let mut state = ViewerState::new();
        state.on_keyframe();
        assert_eq!(state.phase, ViewerPhase::Idle);
    }

    #[test]
    fn test_renegotiation_keeps_connection() {
        let mut state = ViewerState::new();
        state.on_offer();
        state.on_subscribed();
        state.on_keyframe();

        state.on_offer();
        assert!(state.is_streaming());
        assert_eq!(state.negotiations, 2);
    }

    #[test]
    fn test_closed_is_terminal() {
        let mut state = ViewerState::new();
        state.close();

        state.on_offer();
        state.on_subscribed();
        state.on_keyframe();
        assert!(state.is_closed());
        assert_eq!(state.negotiations, 0);
    }
}
