//! Media transport abstraction
//!
//! The relay never touches RTP, ICE or DTLS itself. A [`MediaTransport`]
//! negotiates one peer connection and reports connectivity changes and
//! locally gathered candidates as [`TransportEvent`]s on a channel handed out
//! alongside it. Decodable frames go out through a [`FrameSink`], a handle
//! on the connection's video track that the forwarding task of each
//! subscription owns.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::hub::Frame;
use crate::server::RelayConfig;
use crate::signaling::{IceCandidate, SessionDescription};

/// Connectivity state of a peer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

impl ConnectivityState {
    /// Whether media can flow in this state
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            ConnectivityState::Connected | ConnectivityState::Completed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectivityState::New => "new",
            ConnectivityState::Checking => "checking",
            ConnectivityState::Connected => "connected",
            ConnectivityState::Completed => "completed",
            ConnectivityState::Disconnected => "disconnected",
            ConnectivityState::Failed => "failed",
            ConnectivityState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asynchronous notification from a media transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connectivity(ConnectivityState),
    LocalCandidate(IceCandidate),
}

/// Write side of a viewer's video track
pub trait FrameSink: Send + 'static {
    /// Queue one decodable frame for delivery
    fn send_frame(
        &mut self,
        frame: Frame,
        duration: Duration,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// One negotiated, encrypted media connection to a viewer
pub trait MediaTransport {
    type Sink: FrameSink;

    /// Apply a remote offer and produce the local answer
    fn negotiate(
        &mut self,
        offer: SessionDescription,
    ) -> impl Future<Output = Result<SessionDescription, TransportError>> + Send;

    /// Add a candidate received from the viewer
    fn add_remote_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// A new handle on the video track
    ///
    /// Sending through it must not wait on negotiation or candidate
    /// handling in progress on the transport itself.
    fn frame_sink(&self) -> Self::Sink;

    /// Tear the connection down
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Creates one media transport per viewer
pub trait TransportFactory: Send + Sync + 'static {
    type Transport: MediaTransport + Send + 'static;

    /// Build a transport and the receiver for its events
    fn create(
        &self,
        config: &RelayConfig,
    ) -> Result<(Self::Transport, mpsc::Receiver<TransportEvent>), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_states() {
        assert!(ConnectivityState::Connected.is_connected());
        assert!(ConnectivityState::Completed.is_connected());

        for state in [
            ConnectivityState::New,
            ConnectivityState::Checking,
            ConnectivityState::Disconnected,
            ConnectivityState::Failed,
            ConnectivityState::Closed,
        ] {
            assert!(!state.is_connected(), "{state}");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectivityState::Failed.to_string(), "failed");
    }
}
