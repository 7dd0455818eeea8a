//! Live VP9 broadcast relay
//!
//! Relays one continuously produced VP9 stream to any number of real-time
//! viewers that join and leave at arbitrary times.
//!
//! ```text
//! FrameSource ─► run_ingest ─► BroadcastHub ─► Subscription ─► ViewerSession ─► MediaTransport
//!  (IVF/VP9)                    (one task)      (per viewer)    (keyframe gate)
//!                                                                    ▲
//!                                                    SignalingTransport (WebSocket/JSON)
//! ```
//!
//! The crate owns the distribution core: the fan-out hub, the per-viewer
//! admission state machine and the signaling exchange. Media delivery
//! (ICE, DTLS, RTP packetization) is provided by an implementation of
//! [`transport::MediaTransport`].
//!
//! # Example
//!
//! ```no_run
//! use rtc_relay::hub::{BroadcastHub, HubConfig};
//! use rtc_relay::media::IvfReader;
//! use rtc_relay::server::{RelayConfig, RelayServer};
//! # use rtc_relay::transport::TransportFactory;
//! # async fn run<F: TransportFactory>(factory: F) -> rtc_relay::Result<()> {
//! let config = RelayConfig::default();
//! let (hub, _task) = BroadcastHub::spawn(config.hub.clone());
//! let source = IvfReader::new(tokio::io::stdin()).await?;
//!
//! let server = RelayServer::new(config, factory, hub);
//! server.broadcast(source).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod hub;
pub mod ingest;
pub mod media;
pub mod server;
pub mod session;
pub mod signaling;
pub mod stats;
pub mod transport;

pub use error::{Error, Result};
pub use hub::{BroadcastHub, Frame, HubConfig, HubHandle, Subscription};
pub use ingest::run_ingest;
pub use server::{RelayConfig, RelayServer};
pub use session::{SessionConfig, ViewerSession};
