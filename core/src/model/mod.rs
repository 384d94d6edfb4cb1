//! Skeleton data model.
//!
//! The client state machine owns one live [`Skeleton`] and mutates it as
//! packets arrive; everything a consumer sees is a snapshot.

pub mod skeleton;

pub use skeleton::{
    GraphError, Skeleton, SkeletonEdge, SkeletonEdgeKind, SkeletonNode, Traverse,
};
