//! Subscriber intake handles

use std::fmt;

use tokio::sync::mpsc;

use super::frame::Frame;

/// Identity of a subscription within the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(super) u64);

impl SubscriptionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// One viewer's registered intake point
///
/// The hub owns the write side; this handle is the only reader. Receiving
/// `None` means the intake was closed, either by `unsubscribe`, by eviction,
/// or by hub shutdown.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::Receiver<Frame>,
}

impl Subscription {
    pub(super) fn new(id: SubscriptionId, rx: mpsc::Receiver<Frame>) -> Self {
        Self { id, rx }
    }

    /// Identity of this subscription
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Receive the next frame, or `None` at end-of-stream
    ///
    /// Cancel safe.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Receive without waiting
    pub fn try_recv(&mut self) -> Result<Frame, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }

    /// Close the intake from the reading side
    ///
    /// Frames already buffered can still be received; the hub's next
    /// delivery attempt fails and it drops its end.
    pub(super) fn close(&mut self) {
        self.rx.close();
    }
}
