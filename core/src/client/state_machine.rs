//! Connection state machine.
//!
//! One task owns the transport, the frame buffer, and the live skeleton.
//! The only suspension points are the transport read, the reconnect
//! backoff sleep, and the cancellation signal; the three are raced, so a
//! shutdown request always preempts an in-progress connect or read and
//! the transport is released from a well-defined state.
//!
//! ```text
//! Disconnected ──► Connecting ──► Connected ◄──► Degraded
//!                      ▲              │              │
//!                      └──────────────┴──(link dead)─┘
//!          any state ──► ShuttingDown ──► Terminated
//! ```
//!
//! The skeleton persists across `Degraded` (transient hiccups) but is
//! reset by `Connecting` (a fresh link starts from an empty model).

use tokio::io::AsyncReadExt;
use tokio::sync::watch;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use crate::model::{GraphError, Skeleton};
use crate::net::{Connector, FrameBuffer, Packet};

use super::config::ClientConfig;
use super::events::{ClientEvent, EventSender, ShutdownReason};

/// Transport read chunk size.
const READ_BUF_SIZE: usize = 4096;

/// The states of the client connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Initial state; no resources held.
    Disconnected,
    /// Establishing the byte stream, with exponential backoff.
    Connecting,
    /// Decoding packets and applying them to the skeleton.
    Connected,
    /// Grace window after a malformed frame or read failure; the
    /// skeleton is preserved while the same link is retried.
    Degraded,
    /// Draining and releasing the transport.
    ShuttingDown,
    /// Terminal; no further transitions.
    Terminated,
}

/// How a connected session ended.
enum SessionEnd {
    /// The degraded grace ran out; reconnect.
    LinkDead,
    /// Cancellation observed; shut down.
    Canceled,
}

pub(crate) struct StateMachine<C: Connector> {
    connector: C,
    config: ClientConfig,
    events: EventSender,
    cancel: CancellationToken,
    state: watch::Sender<ClientState>,
}

impl<C: Connector> StateMachine<C> {
    pub(crate) fn new(
        connector: C,
        config: ClientConfig,
        events: EventSender,
        state: watch::Sender<ClientState>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            connector,
            config,
            events,
            cancel,
            state,
        }
    }

    fn state(&self) -> ClientState {
        *self.state.borrow()
    }

    fn set_state(&self, state: ClientState) {
        self.state.send_replace(state);
    }

    /// Drive the machine until shutdown. Always emits a terminal
    /// `ShutDown` event before returning.
    pub(crate) async fn run(mut self) {
        let reason = self.run_until_shutdown().await;
        self.set_state(ClientState::ShuttingDown);
        tracing::info!(?reason, "client shutting down");
        self.events.send(ClientEvent::ShutDown(reason)).await;
        self.set_state(ClientState::Terminated);
    }

    async fn run_until_shutdown(&mut self) -> ShutdownReason {
        loop {
            let stream = match self.connect_with_backoff().await {
                Ok(stream) => stream,
                Err(reason) => return reason,
            };
            match self.run_session(stream).await {
                SessionEnd::LinkDead => {
                    self.events.send(ClientEvent::ConnectionLost).await;
                    // Loop back to Connecting; the session owned the
                    // skeleton, so the model resets with the link.
                }
                SessionEnd::Canceled => return ShutdownReason::UserRequested,
            }
        }
    }

    /// `Connecting`: retry with exponential backoff until a link is
    /// established, attempts run out, or cancellation wins the race.
    async fn connect_with_backoff(&mut self) -> Result<C::Stream, ShutdownReason> {
        self.set_state(ClientState::Connecting);
        for attempt in 0..self.config.reconnect.max_attempts {
            let delay = self.config.reconnect.delay_before(attempt);
            if !delay.is_zero() {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(ShutdownReason::UserRequested),
                    _ = sleep(delay) => {}
                }
            }
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(ShutdownReason::UserRequested),
                result = self.connector.connect() => match result {
                    Ok(stream) => {
                        tracing::info!(attempt, "link established");
                        return Ok(stream);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "connect attempt failed");
                    }
                },
            }
        }
        Err(ShutdownReason::RetriesExhausted)
    }

    /// `Connected`/`Degraded`: read, reassemble, decode, apply.
    async fn run_session(&mut self, mut stream: C::Stream) -> SessionEnd {
        self.set_state(ClientState::Connected);
        let mut skeleton = Skeleton::new();
        let mut frames = FrameBuffer::new();
        let mut read_buf = vec![0u8; READ_BUF_SIZE];
        let mut strikes = 0u32;
        let mut degraded_since: Option<Instant> = None;

        // A fresh link starts from an empty model.
        self.events
            .send(ClientEvent::SkeletonUpdated(skeleton.snapshot()))
            .await;

        loop {
            // Drain every whole frame before suspending on the next read,
            // so events keep strict decode order.
            loop {
                match frames.next_packet() {
                    Ok(Some(packet)) => match self.apply_packet(packet, &mut skeleton).await {
                        Ok(()) => {
                            if self.state() == ClientState::Degraded {
                                tracing::info!("clean frame while degraded; link recovered");
                                self.set_state(ClientState::Connected);
                                strikes = 0;
                                degraded_since = None;
                            }
                        }
                        Err(e) => {
                            // Decodes at the codec layer but violates the
                            // forest invariant; same class as a malformed
                            // frame.
                            tracing::warn!(error = %e, "topology announcement rejected; keeping current skeleton");
                            if self.strike(&mut strikes, &mut degraded_since) {
                                return SessionEnd::LinkDead;
                            }
                        }
                    },
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "malformed frame");
                        frames.skip_frame();
                        if self.strike(&mut strikes, &mut degraded_since) {
                            return SessionEnd::LinkDead;
                        }
                    }
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return SessionEnd::Canceled,
                result = stream.read(&mut read_buf) => match result {
                    Ok(0) => {
                        // EOF: the peer closed the link; nothing left to
                        // resume on.
                        tracing::warn!("transport closed by peer");
                        return SessionEnd::LinkDead;
                    }
                    Ok(n) => frames.extend(&read_buf[..n]),
                    Err(e) => {
                        tracing::warn!(error = %e, "transport read failed");
                        if self.strike(&mut strikes, &mut degraded_since) {
                            return SessionEnd::LinkDead;
                        }
                    }
                },
            }
        }
    }

    /// Record a hiccup, entering `Degraded` if not already there.
    /// Returns true when the grace (strike count or wall clock) ran out.
    fn strike(&mut self, strikes: &mut u32, degraded_since: &mut Option<Instant>) -> bool {
        if self.state() != ClientState::Degraded {
            tracing::warn!("entering degraded state; skeleton preserved");
            self.set_state(ClientState::Degraded);
        }
        *strikes += 1;
        let now = Instant::now();
        let since = *degraded_since.get_or_insert(now);
        *strikes >= self.config.degraded.max_strikes
            || now.duration_since(since) >= self.config.degraded.grace()
    }

    /// Apply one decoded packet to the live skeleton and emit the
    /// matching event. `Err` means a topology announcement violated the
    /// forest invariant; the current skeleton is kept.
    async fn apply_packet(
        &mut self,
        packet: Packet,
        skeleton: &mut Skeleton,
    ) -> Result<(), GraphError> {
        match packet {
            Packet::PoseUpdate { bone, pose } => {
                match skeleton.apply_pose(bone, pose) {
                    Ok(()) => {
                        self.events
                            .send(ClientEvent::SkeletonUpdated(skeleton.snapshot()))
                            .await;
                    }
                    Err(e) => {
                        // Lossy real-time input: a pose for a bone outside
                        // the current topology is dropped, not fatal.
                        tracing::debug!(error = %e, "pose update for absent bone skipped");
                    }
                }
                Ok(())
            }
            Packet::TopologyChange(spec) => {
                // Whole-graph swap: consumers never observe a graph
                // violating the forest invariant mid-update.
                *skeleton = spec.build_skeleton()?;
                self.events
                    .send(ClientEvent::TopologyChanged(skeleton.snapshot()))
                    .await;
                Ok(())
            }
            Packet::Heartbeat => Ok(()),
            Packet::Error { code, message } => {
                tracing::warn!(code, message = %message, "hub reported an error");
                Ok(())
            }
        }
    }
}
