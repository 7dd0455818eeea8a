//! Hub configuration

/// How the hub hands a frame to each subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Each intake holds a single frame and the hub waits until it is
    /// accepted. A stalled subscriber stalls every other subscriber, but all
    /// subscribers see exactly the same frame sequence.
    Blocking,
    /// Each intake buffers up to `capacity` frames. A subscriber whose intake
    /// is full when a frame is dispatched is evicted: its intake is closed
    /// and it observes end-of-stream.
    DropSlow { capacity: usize },
}

impl DeliveryPolicy {
    /// Channel capacity backing each subscriber intake
    pub fn intake_capacity(&self) -> usize {
        match self {
            DeliveryPolicy::Blocking => 1,
            DeliveryPolicy::DropSlow { capacity } => (*capacity).max(1),
        }
    }
}

/// Configuration for the broadcast hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of the request channel into the hub loop
    pub command_capacity: usize,

    /// Per-subscriber delivery policy
    pub delivery: DeliveryPolicy,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            command_capacity: 64,
            delivery: DeliveryPolicy::Blocking,
        }
    }
}

impl HubConfig {
    /// Set the request channel capacity
    pub fn command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity.max(1);
        self
    }

    /// Set the delivery policy
    pub fn delivery(mut self, policy: DeliveryPolicy) -> Self {
        self.delivery = policy;
        self
    }

    /// Evict subscribers that fall more than `capacity` frames behind
    pub fn drop_slow(self, capacity: usize) -> Self {
        self.delivery(DeliveryPolicy::DropSlow { capacity })
    }
}
