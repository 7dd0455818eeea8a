//! Viewer session
//!
//! One task per viewer. It multiplexes with `select!`:
//!
//! - media transport events (connectivity changes, local candidates)
//! - signaling messages (offer, candidates, pings and pongs)
//! - the keep-alive timer
//! - the forwarding task of the current subscription (gate opened, ended)
//!
//! Connectivity drives the subscription: connected subscribes and spawns a
//! forwarding task with a fresh gate, anything else cancels the task and
//! unsubscribes. Frames never pass through this loop, so a slow negotiation
//! or a stalled signaling send only delays this viewer's control messages.
//! Signaling closure or a fatal error ends the session and releases the
//! subscription and the transport.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};

use super::config::SessionConfig;
use super::context::ViewerContext;
use super::forward::{ForwardEnd, Forwarder};
use super::state::ViewerState;
use crate::error::{Error, Result, SignalingError};
use crate::hub::{HubHandle, SubscriptionId};
use crate::signaling::{SignalMessage, SignalingTransport};
use crate::stats::{ForwardCounters, ViewerStats};
use crate::transport::{ConnectivityState, MediaTransport, TransportEvent};

const MIN_KEEPALIVE: Duration = Duration::from_millis(10);

/// Why a session ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The viewer closed the signaling channel
    SignalingClosed,
    /// The hub closed the viewer's intake (shutdown or eviction)
    StreamEnded,
}

/// Outcome of a finished session
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub end: SessionEnd,
    pub stats: ViewerStats,
}

struct ActiveSubscription {
    id: SubscriptionId,
    task: JoinHandle<ForwardEnd>,
    opened: Option<oneshot::Receiver<()>>,
}

impl Drop for ActiveSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

enum Input {
    Transport(Option<TransportEvent>),
    Signal(std::result::Result<Option<SignalMessage>, SignalingError>),
    Keepalive,
    GateOpened(bool),
    Forwarding(std::result::Result<ForwardEnd, JoinError>),
}

enum Flow {
    Continue,
    End(SessionEnd),
}

/// A single viewer's admission and lifecycle state machine
pub struct ViewerSession<S, T> {
    ctx: ViewerContext,
    config: SessionConfig,
    hub: HubHandle,
    signaling: S,
    transport: T,
    events: mpsc::Receiver<TransportEvent>,
    events_open: bool,
    state: ViewerState,
    active: Option<ActiveSubscription>,
    stats: ViewerStats,
    counters: Arc<ForwardCounters>,
    missed_pongs: u32,
}

impl<S, T> ViewerSession<S, T>
where
    S: SignalingTransport + Send,
    T: MediaTransport + Send,
{
    pub fn new(
        ctx: ViewerContext,
        config: SessionConfig,
        hub: HubHandle,
        signaling: S,
        transport: T,
        events: mpsc::Receiver<TransportEvent>,
    ) -> Self {
        Self {
            ctx,
            config,
            hub,
            signaling,
            transport,
            events,
            events_open: true,
            state: ViewerState::new(),
            active: None,
            stats: ViewerStats::new(),
            counters: Arc::new(ForwardCounters::new()),
            missed_pongs: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    /// Run until the signaling channel closes, the stream ends, or a fatal
    /// error occurs. Resources are released on every path.
    pub async fn run(mut self) -> Result<SessionSummary> {
        tracing::info!(
            session_id = self.ctx.session_id,
            peer = ?self.ctx.peer_addr,
            "Viewer session started"
        );

        let result = self.drive().await;
        self.teardown().await;

        self.counters.fill(&mut self.stats);
        let stats = self.stats.clone();
        match &result {
            Ok(end) => tracing::info!(
                session_id = self.ctx.session_id,
                end = ?end,
                forwarded = stats.frames_forwarded,
                gated = stats.frames_gated,
                invalid = stats.frames_invalid,
                subscriptions = stats.subscriptions,
                duration_secs = self.state.duration().as_secs(),
                "Viewer session ended"
            ),
            Err(e) => tracing::info!(
                session_id = self.ctx.session_id,
                error = %e,
                forwarded = stats.frames_forwarded,
                subscriptions = stats.subscriptions,
                "Viewer session closed with error"
            ),
        }

        result.map(|end| SessionSummary { end, stats })
    }

    async fn drive(&mut self) -> Result<SessionEnd> {
        let period = self.config.keepalive_interval.max(MIN_KEEPALIVE);
        let mut keepalive = time::interval_at(Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let input = tokio::select! {
                biased;
                event = self.events.recv(), if self.events_open => Input::Transport(event),
                msg = self.signaling.recv() => Input::Signal(msg),
                _ = keepalive.tick() => Input::Keepalive,
                input = forwarding_event(&mut self.active) => input,
            };

            let flow = match input {
                Input::Transport(Some(TransportEvent::Connectivity(state))) => {
                    self.on_connectivity(state).await?
                }
                Input::Transport(Some(TransportEvent::LocalCandidate(candidate))) => {
                    self.signaling
                        .send(SignalMessage::Candidate(candidate))
                        .await?;
                    Flow::Continue
                }
                Input::Transport(None) => {
                    // Transport gone for good; treat as a final disconnect
                    self.events_open = false;
                    self.on_connectivity(ConnectivityState::Closed).await?
                }
                Input::Signal(Ok(Some(msg))) => self.on_message(msg).await?,
                Input::Signal(Ok(None)) => Flow::End(SessionEnd::SignalingClosed),
                Input::Signal(Err(e)) => return Err(e.into()),
                Input::Keepalive => {
                    self.on_keepalive().await?;
                    Flow::Continue
                }
                Input::GateOpened(opened) => {
                    if let Some(active) = self.active.as_mut() {
                        active.opened = None;
                    }
                    if opened {
                        self.state.on_keyframe();
                    }
                    Flow::Continue
                }
                Input::Forwarding(end) => self.on_forwarding_end(end).await,
            };

            if let Flow::End(end) = flow {
                return Ok(end);
            }
        }
    }

    async fn on_message(&mut self, msg: SignalMessage) -> Result<Flow> {
        match msg {
            SignalMessage::Offer(offer) => {
                self.state.on_offer();
                tracing::debug!(session_id = self.ctx.session_id, "Negotiating");

                let answer = self.transport.negotiate(offer).await?;
                self.signaling.send(SignalMessage::Answer(answer)).await?;
            }
            SignalMessage::Candidate(candidate) => {
                self.transport.add_remote_candidate(candidate).await?;
            }
            SignalMessage::Pong => {
                self.missed_pongs = 0;
            }
            SignalMessage::Ping => {
                self.signaling.send(SignalMessage::Pong).await?;
            }
            SignalMessage::Answer(_) => {
                tracing::warn!(session_id = self.ctx.session_id, "Viewer sent an answer");
                return Err(SignalingError::Unexpected("answer").into());
            }
        }
        Ok(Flow::Continue)
    }

    async fn on_connectivity(&mut self, state: ConnectivityState) -> Result<Flow> {
        tracing::debug!(
            session_id = self.ctx.session_id,
            state = %state,
            "Connectivity changed"
        );
        self.state.on_connectivity(state);

        if state.is_connected() {
            if self.active.is_none() {
                return self.attach().await;
            }
        } else {
            self.detach().await;
        }
        Ok(Flow::Continue)
    }

    /// Take a fresh subscription and start forwarding; its gate starts closed
    async fn attach(&mut self) -> Result<Flow> {
        let subscription = match self.hub.subscribe().await {
            Ok(subscription) => subscription,
            Err(Error::HubClosed) => return Ok(Flow::End(SessionEnd::StreamEnded)),
            Err(e) => return Err(e),
        };
        let id = subscription.id();

        let (forwarder, opened) = Forwarder::new(
            self.ctx.session_id,
            subscription,
            self.transport.frame_sink(),
            self.config.frame_duration,
            Arc::clone(&self.counters),
        );

        tracing::info!(
            session_id = self.ctx.session_id,
            subscription = %id,
            "Viewer subscribed"
        );

        self.active = Some(ActiveSubscription {
            id,
            task: tokio::spawn(forwarder.run()),
            opened: Some(opened),
        });
        self.stats.subscriptions += 1;
        self.state.on_subscribed();
        Ok(Flow::Continue)
    }

    /// Stop forwarding and give the subscription back to the hub
    async fn detach(&mut self) {
        if let Some(mut active) = self.active.take() {
            // Cancelling drops the intake, which frees a hub blocked on it
            active.task.abort();
            let _ = (&mut active.task).await;
            self.hub.release(active.id).await;
            self.state.on_unsubscribed();

            tracing::info!(
                session_id = self.ctx.session_id,
                subscription = %active.id,
                "Viewer unsubscribed"
            );
        }
    }

    async fn on_forwarding_end(
        &mut self,
        end: std::result::Result<ForwardEnd, JoinError>,
    ) -> Flow {
        let Some(active) = self.active.take() else {
            return Flow::Continue;
        };
        self.state.on_unsubscribed();

        match end {
            Ok(ForwardEnd::StreamEnded) => {
                tracing::debug!(
                    session_id = self.ctx.session_id,
                    subscription = %active.id,
                    "Intake closed by hub"
                );
                Flow::End(SessionEnd::StreamEnded)
            }
            Ok(ForwardEnd::SendFailed(e)) => {
                tracing::warn!(
                    session_id = self.ctx.session_id,
                    error = %e,
                    "Frame send failed, releasing subscription"
                );
                self.hub.release(active.id).await;
                Flow::Continue
            }
            Err(e) => {
                tracing::error!(
                    session_id = self.ctx.session_id,
                    error = %e,
                    "Forwarding task failed, releasing subscription"
                );
                self.hub.release(active.id).await;
                Flow::Continue
            }
        }
    }

    async fn on_keepalive(&mut self) -> Result<()> {
        if let Some(max) = self.config.max_missed_pongs {
            if self.missed_pongs >= max {
                return Err(Error::KeepaliveTimeout {
                    missed: self.missed_pongs,
                });
            }
        }

        tracing::debug!(
            session_id = self.ctx.session_id,
            missed = self.missed_pongs,
            "Keep-alive ping"
        );
        self.signaling.send(SignalMessage::Ping).await?;
        self.missed_pongs += 1;
        Ok(())
    }

    async fn teardown(&mut self) {
        self.detach().await;
        self.state.close();
        self.transport.close().await;
    }
}

/// Next event from the current forwarding task: its gate opened (`true`),
/// or its first-keyframe signal was dropped unsent (`false`), or the task
/// ended. Pends forever without a subscription.
async fn forwarding_event(active: &mut Option<ActiveSubscription>) -> Input {
    let Some(active) = active else {
        return std::future::pending().await;
    };

    match active.opened.as_mut() {
        Some(opened) => tokio::select! {
            biased;
            result = opened => Input::GateOpened(result.is_ok()),
            end = &mut active.task => Input::Forwarding(end),
        },
        None => Input::Forwarding((&mut active.task).await),
    }
}
