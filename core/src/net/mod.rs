//! Networking for the Kinlink client.
//!
//! ```text
//!                 ┌──────────────────────┐
//!                 │   Client task        │
//!                 └──────────┬───────────┘
//!                            │ Packet
//!                 ┌──────────▼───────────┐
//!                 │  protocol / framing  │
//!                 └──────────┬───────────┘
//!                            │ bytes
//!                 ┌──────────▼───────────┐
//!                 │  transport (stream)  │
//!                 └──────────────────────┘
//! ```
//!
//! [`protocol`] defines the length-framed wire format, [`framing`]
//! reassembles fragmented reads into whole frames, and [`transport`]
//! abstracts the physical link.

pub mod framing;
pub mod protocol;
pub mod transport;

pub use framing::FrameBuffer;
pub use protocol::{
    HEADER_SIZE, MAX_PAYLOAD, Packet, PacketType, ProtocolError, TopologyEntry, TopologySpec,
};
pub use transport::{Connector, TcpConnector};
