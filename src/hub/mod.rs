//! Broadcast hub for live fan-out
//!
//! The hub relays one live frame sequence to a changing set of subscribers.
//! A single task owns the subscriber set; everybody else talks to it through
//! a [`HubHandle`].
//!
//! # Architecture
//!
//! ```text
//!   [Ingest loop]        [ViewerSession]       [ViewerSession]
//!   broadcast(frame)     subscribe()           unsubscribe(sub)
//!         │                    │                     │
//!         └────────────────────┼─────────────────────┘
//!                              ▼
//!                  mpsc::Sender<HubCommand>
//!                  ┌────────────────────────┐
//!                  │ BroadcastHub::run()    │
//!                  │ slots: Vec<Option<..>> │
//!                  └───────────┬────────────┘
//!              ┌───────────────┼───────────────┐
//!              ▼               ▼               ▼
//!        Subscription    Subscription    Subscription
//!         .recv()         .recv()         .recv()
//! ```
//!
//! # Ordering
//!
//! Requests are applied in the order the hub receives them. Every
//! subscriber registered when a frame is dispatched receives it before any
//! later membership change takes effect, and a subscriber registered after
//! the frame never sees it.
//!
//! # Zero-Copy Design
//!
//! Frame payloads are `bytes::Bytes`; each subscriber gets a reference
//! counted view of the same allocation.

pub mod config;
pub mod frame;
pub mod store;
pub mod subscription;

pub use config::{DeliveryPolicy, HubConfig};
pub use frame::Frame;
pub use store::{BroadcastHub, HubHandle};
pub use subscription::{Subscription, SubscriptionId};
