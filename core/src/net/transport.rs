//! Transport boundary.
//!
//! The client never sees a concrete link type: a transport is any
//! ordered, possibly-fragmenting byte stream, and a [`Connector`] is the
//! exclusive factory that (re)establishes one. The physical medium
//! (TCP, serial bridge, in-memory pipe in tests) stays behind this seam.

use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Establishes transport streams to the hub.
///
/// The client owns the connector and the streams it produces; no other
/// component may read the same link concurrently.
pub trait Connector: Send {
    /// The byte-stream type this connector produces.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Attempt to establish a fresh link to the hub.
    fn connect(&mut self) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/// Connects to a hub over TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    /// `addr` in `host:port` form, e.g. `"127.0.0.1:21110"`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&mut self) -> io::Result<TcpStream> {
        let stream = TcpStream::connect(&self.addr).await?;
        stream.set_nodelay(true)?;
        tracing::debug!(addr = %self.addr, "connected to hub");
        Ok(stream)
    }
}
