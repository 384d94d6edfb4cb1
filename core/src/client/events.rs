//! Consumer-facing event stream.
//!
//! The client task is the producer; consumers pull [`ClientEvent`]s from
//! an [`EventStream`]. Events are delivered strictly in decode order.
//! What happens when a consumer falls behind is the configured
//! [`BackpressurePolicy`](super::BackpressurePolicy): a bounded channel
//! the producer awaits on, or a ring that sheds the oldest events.

use tokio::sync::{broadcast, mpsc};

use crate::model::Skeleton;

use super::config::{BackpressurePolicy, ClientConfig};

/// Why the client stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The cancellation signal was raised.
    UserRequested,
    /// Every connect attempt failed.
    RetriesExhausted,
}

/// Observable client output. Snapshots are immutable copies; holding one
/// never blocks or races the live skeleton.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A pose update was applied to the current skeleton.
    SkeletonUpdated(Skeleton),
    /// The hub announced a new topology; the skeleton was replaced.
    TopologyChanged(Skeleton),
    /// The link died (degraded grace exhausted); a reconnect follows.
    ConnectionLost,
    /// Terminal event; the stream ends after delivering it.
    ShutDown(ShutdownReason),
}

pub(crate) enum EventSender {
    Bounded(mpsc::Sender<ClientEvent>),
    Ring(broadcast::Sender<ClientEvent>),
}

impl EventSender {
    /// Deliver one event. With [`BackpressurePolicy::Block`] this awaits
    /// buffer space; with `DropOldest` it never suspends. A vanished
    /// consumer is not an error for the producer.
    pub(crate) async fn send(&self, event: ClientEvent) {
        match self {
            Self::Bounded(tx) => {
                let _ = tx.send(event).await;
            }
            Self::Ring(tx) => {
                let _ = tx.send(event);
            }
        }
    }
}

enum StreamInner {
    Bounded(mpsc::Receiver<ClientEvent>),
    Ring(broadcast::Receiver<ClientEvent>),
}

/// Lazy sequence of [`ClientEvent`]s.
///
/// Logically infinite while the client runs; finite once shutdown is
/// requested: the stream yields `None` after `ShutDown`.
pub struct EventStream {
    inner: StreamInner,
    done: bool,
}

impl EventStream {
    /// Next event, or `None` once the client has shut down.
    pub async fn next(&mut self) -> Option<ClientEvent> {
        if self.done {
            return None;
        }
        let event = match &mut self.inner {
            StreamInner::Bounded(rx) => rx.recv().await,
            StreamInner::Ring(rx) => loop {
                match rx.recv().await {
                    Ok(event) => break Some(event),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "consumer lagged; oldest events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break None,
                }
            },
        };
        if matches!(event, Some(ClientEvent::ShutDown(_))) {
            self.done = true;
        }
        event
    }
}

/// Build the producer/consumer pair for `config`.
pub(crate) fn channel(config: &ClientConfig) -> (EventSender, EventStream) {
    let capacity = config.event_capacity.max(1);
    match config.backpressure {
        BackpressurePolicy::Block => {
            let (tx, rx) = mpsc::channel(capacity);
            (
                EventSender::Bounded(tx),
                EventStream {
                    inner: StreamInner::Bounded(rx),
                    done: false,
                },
            )
        }
        BackpressurePolicy::DropOldest => {
            let (tx, rx) = broadcast::channel(capacity);
            (
                EventSender::Ring(tx),
                EventStream {
                    inner: StreamInner::Ring(rx),
                    done: false,
                },
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (tx, mut rx) = channel(&ClientConfig::default());
        tx.send(ClientEvent::ConnectionLost).await;
        tx.send(ClientEvent::ShutDown(ShutdownReason::UserRequested))
            .await;
        assert_eq!(rx.next().await, Some(ClientEvent::ConnectionLost));
        assert_eq!(
            rx.next().await,
            Some(ClientEvent::ShutDown(ShutdownReason::UserRequested))
        );
    }

    #[tokio::test]
    async fn test_stream_ends_after_shutdown() {
        let (tx, mut rx) = channel(&ClientConfig::default());
        tx.send(ClientEvent::ShutDown(ShutdownReason::RetriesExhausted))
            .await;
        tx.send(ClientEvent::ConnectionLost).await;
        assert!(matches!(rx.next().await, Some(ClientEvent::ShutDown(_))));
        assert_eq!(rx.next().await, None);
    }

    #[tokio::test]
    async fn test_drop_oldest_sheds_events_without_blocking() {
        let config = ClientConfig {
            event_capacity: 2,
            backpressure: BackpressurePolicy::DropOldest,
            ..Default::default()
        };
        let (tx, mut rx) = channel(&config);
        // Overfill the ring; the producer never suspends.
        for _ in 0..5 {
            tx.send(ClientEvent::ConnectionLost).await;
        }
        tx.send(ClientEvent::ShutDown(ShutdownReason::UserRequested))
            .await;
        // The newest events survive; the stream still terminates cleanly.
        let mut saw_shutdown = false;
        while let Some(event) = rx.next().await {
            if matches!(event, ClientEvent::ShutDown(_)) {
                saw_shutdown = true;
            }
        }
        assert!(saw_shutdown);
    }

    #[tokio::test]
    async fn test_stream_ends_when_producer_drops() {
        let (tx, mut rx) = channel(&ClientConfig::default());
        drop(tx);
        assert_eq!(rx.next().await, None);
    }
}
