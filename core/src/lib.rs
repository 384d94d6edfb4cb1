//! Kinlink Core - Hub client for body-motion tracking
//!
//! This crate connects to a kinlink hub over a byte-stream transport,
//! decodes the length-framed wire protocol, and maintains a typed
//! skeleton graph that consumers observe through snapshot events.
//!
//! # Architecture
//!
//! - [`net`] - Wire protocol codec, frame reassembly, transport seam
//! - [`model`] - The skeleton forest: bones, edges, poses
//! - [`client`] - Connection state machine, reconnect policy, events

pub mod client;
pub mod model;
pub mod net;

// Re-export the surface most callers need
pub use client::{
    Client, ClientConfig, ClientError, ClientEvent, ClientState, EventStream, ShutdownReason,
};
pub use model::{GraphError, Skeleton, SkeletonEdge, SkeletonEdgeKind, SkeletonNode};
pub use net::{Connector, Packet, ProtocolError, TcpConnector};

// Re-export the shared taxonomy for convenience
pub use kinlink_shared::{BoneKind, BoneMap, DecodeError, Pose};
