//! Relay configuration
//!
//! Captured once at process start and passed to the components that need
//! it; media-transport factories read the network settings from here.

use std::net::SocketAddr;
use std::time::Duration;

use crate::hub::HubConfig;
use crate::session::SessionConfig;

/// Default signaling listen address
pub const DEFAULT_SIGNALING_ADDR: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST), 8080);

/// Default media (ICE-TCP) listen address
pub const DEFAULT_MEDIA_ADDR: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 8514);

/// Network types a media transport may gather candidates for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    Tcp4,
    Tcp6,
}

/// Relay configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the signaling (WebSocket) server binds to
    pub signaling_addr: SocketAddr,

    /// Request path accepted for WebSocket upgrades
    pub signaling_path: String,

    /// Address the media transport listens on
    pub media_addr: SocketAddr,

    /// Network interfaces allowed for media candidates (empty = all)
    pub interfaces: Vec<String>,

    /// Gather IPv6 candidates as well
    pub ipv6: bool,

    /// Maximum concurrent viewers (0 = unlimited)
    pub max_connections: usize,

    /// WebSocket handshake must complete within this time
    pub handshake_timeout: Duration,

    /// Broadcast hub settings
    pub hub: HubConfig,

    /// Per-viewer session settings
    pub session: SessionConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            signaling_addr: DEFAULT_SIGNALING_ADDR,
            signaling_path: "/ice".to_string(),
            media_addr: DEFAULT_MEDIA_ADDR,
            interfaces: Vec::new(),
            ipv6: false,
            max_connections: 0, // Unlimited
            handshake_timeout: Duration::from_secs(10),
            hub: HubConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Set the signaling listen address
    pub fn signaling_addr(mut self, addr: SocketAddr) -> Self {
        self.signaling_addr = addr;
        self
    }

    /// Set the WebSocket request path
    pub fn signaling_path(mut self, path: impl Into<String>) -> Self {
        self.signaling_path = path.into();
        self
    }

    /// Set the media listen address
    pub fn media_addr(mut self, addr: SocketAddr) -> Self {
        self.media_addr = addr;
        self
    }

    /// Restrict media candidates to these interfaces
    pub fn interfaces<I, S>(mut self, interfaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interfaces = interfaces.into_iter().map(Into::into).collect();
        self
    }

    /// Enable IPv6 candidates
    pub fn ipv6(mut self, enabled: bool) -> Self {
        self.ipv6 = enabled;
        self
    }

    /// Set maximum concurrent viewers
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the WebSocket handshake timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set hub configuration
    pub fn hub(mut self, hub: HubConfig) -> Self {
        self.hub = hub;
        self
    }

    /// Set session configuration
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Whether media may use the named interface
    pub fn interface_allowed(&self, name: &str) -> bool {
        self.interfaces.is_empty() || self.interfaces.iter().any(|i| i == name)
    }

    /// Network types enabled for media candidates
    pub fn network_types(&self) -> Vec<NetworkType> {
        if self.ipv6 {
            vec![NetworkType::Tcp4, NetworkType::Tcp6]
        } else {
            vec![NetworkType::Tcp4]
        }
    }
}
