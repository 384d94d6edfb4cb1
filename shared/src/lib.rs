//! Shared types for the Kinlink motion-tracking client.
//!
//! This crate holds the vocabulary the rest of the workspace speaks:
//! the closed bone taxonomy, the total per-bone map, and the POD pose
//! type with its wire form. It carries no I/O and no protocol logic.

pub mod bone;
pub mod bone_map;
pub mod pose;

pub use bone::{BoneKind, DecodeError};
pub use bone_map::BoneMap;
pub use pose::Pose;
