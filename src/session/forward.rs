//! Per-subscription forwarding task
//!
//! Drains one subscription through its keyframe gate into the viewer's
//! video track. It runs as a task of its own, so a session that is busy
//! negotiating or talking to the signaling channel never leaves its intake
//! undrained and never holds up the hub.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use super::gate::{Admission, KeyframeGate};
use crate::error::TransportError;
use crate::hub::Subscription;
use crate::stats::ForwardCounters;
use crate::transport::FrameSink;

/// Why a forwarding task stopped
#[derive(Debug)]
pub enum ForwardEnd {
    /// The hub closed the intake (shutdown or eviction)
    StreamEnded,
    /// The video track rejected a frame
    SendFailed(TransportError),
}

pub(crate) struct Forwarder<K> {
    session_id: u64,
    subscription: Subscription,
    gate: KeyframeGate,
    sink: K,
    frame_duration: Duration,
    counters: Arc<ForwardCounters>,
    opened: Option<oneshot::Sender<()>>,
}

impl<K: FrameSink> Forwarder<K> {
    /// Build a forwarder with a closed gate
    ///
    /// The returned receiver fires when the first keyframe goes out.
    pub(crate) fn new(
        session_id: u64,
        subscription: Subscription,
        sink: K,
        frame_duration: Duration,
        counters: Arc<ForwardCounters>,
    ) -> (Self, oneshot::Receiver<()>) {
        let (opened_tx, opened_rx) = oneshot::channel();
        let forwarder = Self {
            session_id,
            subscription,
            gate: KeyframeGate::new(),
            sink,
            frame_duration,
            counters,
            opened: Some(opened_tx),
        };
        (forwarder, opened_rx)
    }

    pub(crate) async fn run(mut self) -> ForwardEnd {
        while let Some(frame) = self.subscription.recv().await {
            ForwardCounters::add(&self.counters.frames_received, 1);

            match self.gate.admit(&frame) {
                Admission::Forward { opened, .. } => {
                    if opened {
                        tracing::debug!(
                            session_id = self.session_id,
                            subscription = %self.subscription.id(),
                            "First keyframe, streaming"
                        );
                        if let Some(tx) = self.opened.take() {
                            let _ = tx.send(());
                        }
                    }

                    let size = frame.size() as u64;
                    if let Err(e) = self.sink.send_frame(frame, self.frame_duration).await {
                        return ForwardEnd::SendFailed(e);
                    }
                    ForwardCounters::add(&self.counters.frames_forwarded, 1);
                    ForwardCounters::add(&self.counters.bytes_forwarded, size);
                }
                Admission::Gated => ForwardCounters::add(&self.counters.frames_gated, 1),
                Admission::Skipped => ForwardCounters::add(&self.counters.frames_skipped, 1),
                Admission::Invalid(e) => {
                    ForwardCounters::add(&self.counters.frames_invalid, 1);
                    tracing::warn!(
                        session_id = self.session_id,
                        error = %e,
                        "Dropping undecodable frame, check the source codec"
                    );
                }
            }
        }

        ForwardEnd::StreamEnded
    }
}
