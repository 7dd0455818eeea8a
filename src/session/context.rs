//! Viewer context
//!
//! Identifies a viewer session in logs and to embedding code.

use std::net::SocketAddr;

/// Identity of one viewer session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerContext {
    /// Unique session ID
    pub session_id: u64,

    /// Remote peer address of the signaling connection, if known
    pub peer_addr: Option<SocketAddr>,
}

impl ViewerContext {
    /// Create a context without a peer address
    pub fn new(session_id: u64) -> Self {
        Self {
            session_id,
            peer_addr: None,
        }
    }

    /// Attach the signaling peer address
    pub fn with_peer(mut self, peer_addr: SocketAddr) -> Self {
        self.peer_addr = Some(peer_addr);
        self
    }
}
