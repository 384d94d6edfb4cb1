//! Hub client: connection lifecycle, event delivery, configuration.
//!
//! [`Client::spawn`] starts a single background task that owns the
//! transport and the live skeleton; consumers read typed snapshots from
//! the returned [`EventStream`]. Cancel the token passed to `spawn` to
//! shut the client down; the stream always ends with a
//! [`ClientEvent::ShutDown`] event.
//!
//! ```no_run
//! use kinlink_core::client::{Client, ClientConfig, ClientEvent};
//! use kinlink_core::net::TcpConnector;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() {
//! let cancel = CancellationToken::new();
//! let connector = TcpConnector::new("127.0.0.1:6969");
//! let (client, mut events) = Client::spawn(connector, ClientConfig::default(), cancel.clone());
//!
//! while let Some(event) = events.next().await {
//!     match event {
//!         ClientEvent::SkeletonUpdated(skeleton) => drop(skeleton),
//!         ClientEvent::TopologyChanged(skeleton) => drop(skeleton),
//!         ClientEvent::ConnectionLost => {}
//!         ClientEvent::ShutDown(_) => break,
//!     }
//! }
//! client.join().await.unwrap();
//! # }
//! ```

pub mod config;
pub mod events;
pub mod state_machine;


pub use config::{BackpressurePolicy, ClientConfig, DegradedConfig, ReconnectConfig};
pub use events::{ClientEvent, EventStream, ShutdownReason};
pub use state_machine::ClientState;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::net::Connector;
use state_machine::StateMachine;

/// Client task failure.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The background task panicked or was aborted externally.
    #[error("client task did not run to completion")]
    Join(#[source] tokio::task::JoinError),
}

/// Handle to a running hub client.
///
/// Dropping the handle does not stop the task; cancel the token passed
/// to [`Client::spawn`], then [`Client::join`] to wait for it.
pub struct Client {
    task: JoinHandle<()>,
    cancel: CancellationToken,
    state: watch::Receiver<ClientState>,
}

impl Client {
    /// Spawn the client task on the current tokio runtime.
    ///
    /// The task drives the connection state machine until the token is
    /// cancelled or reconnect attempts run out. Events arrive on the
    /// returned stream in decode order.
    pub fn spawn<C>(
        connector: C,
        config: ClientConfig,
        cancel: CancellationToken,
    ) -> (Self, EventStream)
    where
        C: Connector + 'static,
    {
        let (sender, stream) = events::channel(&config);
        let (state_tx, state_rx) = watch::channel(ClientState::Disconnected);
        let machine = StateMachine::new(connector, config, sender, state_tx, cancel.clone());
        let task = tokio::spawn(machine.run());
        (
            Self {
                task,
                cancel,
                state: state_rx,
            },
            stream,
        )
    }

    /// Current lifecycle state of the client task.
    pub fn state(&self) -> ClientState {
        *self.state.borrow()
    }

    /// Watch stream of lifecycle state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ClientState> {
        self.state.clone()
    }

    /// Request shutdown. Idempotent; equivalent to cancelling the token
    /// passed to [`Client::spawn`].
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for the client task to finish.
    pub async fn join(self) -> Result<(), ClientError> {
        self.task.await.map_err(ClientError::Join)
    }
}
