//! Broadcast hub implementation
//!
//! The hub loop is the only owner of the subscriber set. Subscribe,
//! unsubscribe and broadcast requests all travel through one channel, so they
//! are applied in the exact order they were sent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::config::{DeliveryPolicy, HubConfig};
use super::frame::Frame;
use super::subscription::{Subscription, SubscriptionId};
use crate::error::{Error, Result};
use crate::stats::HubStats;

enum HubCommand {
    Subscribe {
        id: SubscriptionId,
        tx: mpsc::Sender<Frame>,
    },
    Unsubscribe(SubscriptionId),
    Broadcast(Frame),
    Stats(oneshot::Sender<HubStats>),
    Shutdown,
}

/// A registered intake; `None` slots are tombstones waiting for reuse
struct Slot {
    id: SubscriptionId,
    tx: mpsc::Sender<Frame>,
}

/// Handle for sending requests to a running hub
///
/// Cheap to clone; every viewer session and the ingest loop hold one.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
    next_id: Arc<AtomicU64>,
    delivery: DeliveryPolicy,
}

impl HubHandle {
    /// Register a new subscriber
    ///
    /// The returned handle can be read from immediately; registration is
    /// applied by the hub loop in order with all other requests.
    pub async fn subscribe(&self) -> Result<Subscription> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.delivery.intake_capacity());

        self.tx
            .send(HubCommand::Subscribe { id, tx })
            .await
            .map_err(|_| Error::HubClosed)?;

        Ok(Subscription::new(id, rx))
    }

    /// Remove a subscriber and close its intake
    ///
    /// Unknown or already removed subscriptions are ignored, as is a hub
    /// that has already stopped.
    pub async fn unsubscribe(&self, subscription: &mut Subscription) {
        // Closing first lets a hub blocked on this intake move on
        subscription.close();
        self.release(subscription.id()).await;
    }

    /// Remove a subscriber by id
    ///
    /// For subscriptions whose handle has already been dropped, e.g. by a
    /// cancelled task. The hub notices the dropped intake on its own at the
    /// next delivery; this removes it without waiting for one.
    pub async fn release(&self, id: SubscriptionId) {
        if self.tx.send(HubCommand::Unsubscribe(id)).await.is_err() {
            tracing::debug!(subscription = %id, "Unsubscribe after hub stopped");
        }
    }

    /// Deliver a frame to every registered subscriber
    pub async fn broadcast(&self, frame: Frame) -> Result<()> {
        self.tx
            .send(HubCommand::Broadcast(frame))
            .await
            .map_err(|_| Error::HubClosed)
    }

    /// Close every subscriber intake and stop the hub
    pub async fn shutdown(&self) {
        let _ = self.tx.send(HubCommand::Shutdown).await;
    }

    /// Current hub statistics
    pub async fn stats(&self) -> Result<HubStats> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(HubCommand::Stats(reply))
            .await
            .map_err(|_| Error::HubClosed)?;
        rx.await.map_err(|_| Error::HubClosed)
    }

    /// Whether the hub loop has stopped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The fan-out actor
///
/// Create with [`BroadcastHub::new`] and drive with [`BroadcastHub::run`], or
/// use [`BroadcastHub::spawn`] to do both.
pub struct BroadcastHub {
    rx: mpsc::Receiver<HubCommand>,
    slots: Vec<Option<Slot>>,
    delivery: DeliveryPolicy,
    stats: HubStats,
}

impl BroadcastHub {
    /// Create a hub and a handle to it
    pub fn new(config: HubConfig) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(config.command_capacity.max(1));

        let hub = Self {
            rx,
            slots: Vec::new(),
            delivery: config.delivery,
            stats: HubStats::default(),
        };
        let handle = HubHandle {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
            delivery: config.delivery,
        };

        (hub, handle)
    }

    /// Spawn the hub loop on the current runtime
    ///
    /// The task resolves to the final statistics once the hub stops.
    pub fn spawn(config: HubConfig) -> (HubHandle, JoinHandle<HubStats>) {
        let (hub, handle) = Self::new(config);
        (handle, tokio::spawn(hub.run()))
    }

    /// Run the decision loop until shutdown or until every handle is dropped
    pub async fn run(mut self) -> HubStats {
        tracing::info!(delivery = ?self.delivery, "Broadcast hub started");

        while let Some(command) = self.rx.recv().await {
            match command {
                HubCommand::Subscribe { id, tx } => self.add(id, tx),
                HubCommand::Unsubscribe(id) => self.remove(id),
                HubCommand::Broadcast(frame) => self.dispatch(frame).await,
                HubCommand::Stats(reply) => {
                    let _ = reply.send(self.snapshot());
                }
                HubCommand::Shutdown => break,
            }
        }

        self.rx.close();
        let remaining = self.subscriber_count();
        self.slots.clear();

        tracing::info!(
            remaining_subscribers = remaining,
            frames = self.stats.frames_broadcast,
            "Broadcast hub stopped"
        );

        self.stats.subscribers = 0;
        self.stats.clone()
    }

    fn add(&mut self, id: SubscriptionId, tx: mpsc::Sender<Frame>) {
        let slot = Some(Slot { id, tx });

        match self.slots.iter_mut().find(|s| s.is_none()) {
            Some(free) => *free = slot,
            None => self.slots.push(slot),
        }

        tracing::info!(
            subscription = %id,
            subscribers = self.subscriber_count(),
            "Subscriber added"
        );
    }

    fn remove(&mut self, id: SubscriptionId) {
        let found = self
            .slots
            .iter_mut()
            .find(|s| s.as_ref().is_some_and(|slot| slot.id == id));

        match found {
            Some(slot) => {
                // Dropping the sender closes the intake
                *slot = None;
                tracing::info!(
                    subscription = %id,
                    subscribers = self.subscriber_count(),
                    "Subscriber removed"
                );
            }
            None => {
                tracing::debug!(subscription = %id, "Unsubscribe of unknown subscription");
            }
        }
    }

    async fn dispatch(&mut self, frame: Frame) {
        self.stats.frames_broadcast += 1;

        for entry in self.slots.iter_mut() {
            let Some(slot) = entry else { continue };

            let keep = match self.delivery {
                DeliveryPolicy::Blocking => slot.tx.send(frame.clone()).await.is_ok(),
                DeliveryPolicy::DropSlow { .. } => match slot.tx.try_send(frame.clone()) {
                    Ok(()) => true,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(subscription = %slot.id, "Evicting slow subscriber");
                        self.stats.evicted += 1;
                        false
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => false,
                },
            };

            if !keep {
                tracing::debug!(subscription = %slot.id, "Subscriber intake closed");
                *entry = None;
            }
        }
    }

    fn subscriber_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn snapshot(&self) -> HubStats {
        HubStats {
            subscribers: self.subscriber_count(),
            ..self.stats.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use tokio::time::timeout;

    use super::*;

    fn frame(n: u8) -> Frame {
        Frame::new(n as u64, Bytes::from(vec![0x80, n]))
    }

    #[tokio::test]
    async fn test_subscribe_and_broadcast() {
        let (hub, _task) = BroadcastHub::spawn(HubConfig::default());

        let mut a = hub.subscribe().await.unwrap();
        let mut b = hub.subscribe().await.unwrap();
        assert_ne!(a.id(), b.id());

        let sender = hub.clone();
        tokio::spawn(async move {
            for n in 0..3 {
                sender.broadcast(frame(n)).await.unwrap();
            }
        });

        for n in 0..3 {
            assert_eq!(a.recv().await.unwrap(), frame(n));
            assert_eq!(b.recv().await.unwrap(), frame(n));
        }
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_frames() {
        let (hub, _task) = BroadcastHub::spawn(HubConfig::default().drop_slow(16));

        let mut early = hub.subscribe().await.unwrap();
        hub.broadcast(frame(1)).await.unwrap();
        let mut late = hub.subscribe().await.unwrap();
        hub.broadcast(frame(2)).await.unwrap();

        assert_eq!(early.recv().await.unwrap(), frame(1));
        assert_eq!(early.recv().await.unwrap(), frame(2));
        assert_eq!(late.recv().await.unwrap(), frame(2));
        assert!(late.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_intake() {
        let (hub, _task) = BroadcastHub::spawn(HubConfig::default());

        let mut sub = hub.subscribe().await.unwrap();
        hub.unsubscribe(&mut sub).await;
        assert!(sub.recv().await.is_none());

        let stats = hub.stats().await.unwrap();
        assert_eq!(stats.subscribers, 0);
    }

    #[tokio::test]
    async fn test_double_unsubscribe_is_noop() {
        let (hub, _task) = BroadcastHub::spawn(HubConfig::default());

        let mut sub = hub.subscribe().await.unwrap();
        let mut other = hub.subscribe().await.unwrap();

        hub.unsubscribe(&mut sub).await;
        timeout(Duration::from_secs(1), hub.unsubscribe(&mut sub))
            .await
            .unwrap();

        // Hub still serves the remaining subscriber
        hub.broadcast(frame(7)).await.unwrap();
        assert_eq!(other.recv().await.unwrap(), frame(7));
        assert_eq!(hub.stats().await.unwrap().subscribers, 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_after_shutdown_does_not_block() {
        let (hub, task) = BroadcastHub::spawn(HubConfig::default());

        let mut sub = hub.subscribe().await.unwrap();
        hub.shutdown().await;
        task.await.unwrap();

        timeout(Duration::from_secs(1), hub.unsubscribe(&mut sub))
            .await
            .unwrap();
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_ends_every_subscriber() {
        let (hub, task) = BroadcastHub::spawn(HubConfig::default().drop_slow(4));

        let mut subs = Vec::new();
        for _ in 0..3 {
            subs.push(hub.subscribe().await.unwrap());
        }
        hub.broadcast(frame(1)).await.unwrap();
        hub.shutdown().await;

        for sub in subs.iter_mut() {
            assert_eq!(sub.recv().await.unwrap(), frame(1));
            assert!(sub.recv().await.is_none());
        }

        let stats = task.await.unwrap();
        assert_eq!(stats.frames_broadcast, 1);
        assert!(hub.is_closed());
        assert!(matches!(hub.broadcast(frame(2)).await, Err(Error::HubClosed)));
        assert!(matches!(hub.subscribe().await, Err(Error::HubClosed)));
    }

    #[tokio::test]
    async fn test_hub_stops_when_handles_dropped() {
        let (hub, task) = BroadcastHub::spawn(HubConfig::default());
        let mut sub = hub.subscribe().await.unwrap();
        drop(hub);

        assert!(sub.recv().await.is_none());
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_released() {
        let (hub, _task) = BroadcastHub::spawn(HubConfig::default());

        let sub = hub.subscribe().await.unwrap();
        drop(sub);
        hub.broadcast(frame(1)).await.unwrap();

        assert_eq!(hub.stats().await.unwrap().subscribers, 0);
    }

    #[tokio::test]
    async fn test_release_dropped_subscription() {
        let (hub, _task) = BroadcastHub::spawn(HubConfig::default());

        let sub = hub.subscribe().await.unwrap();
        let id = sub.id();
        drop(sub);

        hub.release(id).await;
        assert_eq!(hub.stats().await.unwrap().subscribers, 0);

        // Releasing twice is harmless
        hub.release(id).await;
        assert_eq!(hub.stats().await.unwrap().frames_broadcast, 0);
    }

    #[tokio::test]
    async fn test_slot_reuse() {
        let (hub, _task) = BroadcastHub::spawn(HubConfig::default().drop_slow(4));

        let mut a = hub.subscribe().await.unwrap();
        let mut b = hub.subscribe().await.unwrap();
        hub.unsubscribe(&mut a).await;
        let mut c = hub.subscribe().await.unwrap();

        hub.broadcast(frame(9)).await.unwrap();
        assert_eq!(b.recv().await.unwrap(), frame(9));
        assert_eq!(c.recv().await.unwrap(), frame(9));
        assert_eq!(hub.stats().await.unwrap().subscribers, 2);
    }

    #[tokio::test]
    async fn test_blocking_delivery_waits_for_slow_subscriber() {
        let (hub, _task) = BroadcastHub::spawn(HubConfig::default());

        let mut slow = hub.subscribe().await.unwrap();
        hub.broadcast(frame(1)).await.unwrap();
        hub.broadcast(frame(2)).await.unwrap();

        // Frame 2 is held by the hub until the intake has room
        let stats = timeout(Duration::from_millis(50), hub.stats()).await;
        assert!(stats.is_err());

        assert_eq!(slow.recv().await.unwrap(), frame(1));
        assert_eq!(slow.recv().await.unwrap(), frame(2));
        assert_eq!(hub.stats().await.unwrap().evicted, 0);
    }

    #[tokio::test]
    async fn test_drop_slow_evicts_full_subscriber() {
        let (hub, _task) = BroadcastHub::spawn(HubConfig::default().drop_slow(2));

        let mut slow = hub.subscribe().await.unwrap();
        let mut fast = hub.subscribe().await.unwrap();

        for n in 0..4 {
            hub.broadcast(frame(n)).await.unwrap();
            assert_eq!(fast.recv().await.unwrap(), frame(n));
        }

        // Two frames fit, the third overflowed and evicted the subscriber
        assert_eq!(slow.recv().await.unwrap(), frame(0));
        assert_eq!(slow.recv().await.unwrap(), frame(1));
        assert!(slow.recv().await.is_none());

        let stats = hub.stats().await.unwrap();
        assert_eq!(stats.evicted, 1);
        assert_eq!(stats.subscribers, 1);
        assert_eq!(stats.frames_broadcast, 4);
    }
}
