//! Signaling between the relay and its viewers
//!
//! The signaling channel carries session descriptions, connectivity
//! candidates and liveness pings. The relay only needs "receive next
//! message" and "send message", abstracted by [`SignalingTransport`].

pub mod message;
pub mod transport;

pub use message::{IceCandidate, SdpType, SessionDescription, SignalMessage};
pub use transport::{SignalingTransport, WsSignaling};
