//! Live skeleton graph.
//!
//! Bones are nodes keyed by [`BoneKind`]; typed edges form a forest (no
//! cycles, at most one parent per node). The client state machine owns
//! the only mutable instance; consumers receive [`Skeleton::snapshot`]
//! clones, so no cross-task locking is needed.
//!
//! Traversal is deterministic: roots and children are always visited in
//! taxonomy order, never insertion order, so two skeletons built from the
//! same packet sequence traverse identically.

use kinlink_shared::{BoneKind, BoneMap, DecodeError, Pose};
use thiserror::Error;

/// Topology violations rejected by skeleton mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Adding this edge would close a cycle.
    #[error("edge {parent:?} -> {child:?} would create a cycle")]
    Cycle { parent: BoneKind, child: BoneKind },
    /// The child already has an incoming edge.
    #[error("bone {child:?} already has a parent")]
    DuplicateParent { child: BoneKind },
    /// The referenced bone has no node in this skeleton.
    #[error("bone {0:?} is not part of this skeleton")]
    UnknownBone(BoneKind),
}

/// Relationship expressed by an edge between two bones.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkeletonEdgeKind {
    /// Child pose is rigidly attached to the parent.
    Rigid = 0,
    /// Child follows the parent under a fixed-length constraint.
    LengthConstrained = 1,
}

impl TryFrom<u8> for SkeletonEdgeKind {
    type Error = DecodeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Rigid),
            1 => Ok(Self::LengthConstrained),
            other => Err(DecodeError::UnknownEdgeKind(other)),
        }
    }
}

/// A bone present in the skeleton: identity, current local pose, and the
/// parent it hangs from (if any).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletonNode {
    pub kind: BoneKind,
    pub pose: Pose,
    pub parent: Option<BoneKind>,
}

/// A typed edge, stored against its child (one incoming edge per node).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkeletonEdge {
    pub parent: BoneKind,
    pub child: BoneKind,
    pub kind: SkeletonEdgeKind,
}

/// The full bone graph: nodes plus incoming edges, both total maps over
/// the taxonomy with absence modeled as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    nodes: BoneMap<Option<SkeletonNode>>,
    edges: BoneMap<Option<SkeletonEdge>>,
}

impl Skeleton {
    /// Empty skeleton: no bones, no edges.
    pub fn new() -> Self {
        Self::default()
    }

    /// Full default topology: every taxonomy bone at identity pose, wired
    /// per the taxonomy's parent table with rigid edges.
    pub fn default_topology() -> Self {
        let mut skeleton = Self::new();
        for kind in BoneKind::iter() {
            skeleton.add_bone(kind);
        }
        for kind in BoneKind::iter() {
            if let Some(parent) = kind.parent() {
                // The taxonomy tables are a tree, so this cannot fail.
                skeleton
                    .add_edge(parent, kind, SkeletonEdgeKind::Rigid)
                    .unwrap();
            }
        }
        skeleton
    }

    /// Insert a bone at identity pose. Idempotent; an existing node keeps
    /// its pose and parent.
    pub fn add_bone(&mut self, kind: BoneKind) {
        if self.nodes[kind].is_none() {
            self.nodes[kind] = Some(SkeletonNode {
                kind,
                pose: Pose::IDENTITY,
                parent: None,
            });
        }
    }

    /// Connect `child` under `parent` with a typed edge.
    ///
    /// Preserves the forest invariant: rejects unknown endpoints, a second
    /// incoming edge, and anything that would close a cycle.
    pub fn add_edge(
        &mut self,
        parent: BoneKind,
        child: BoneKind,
        kind: SkeletonEdgeKind,
    ) -> Result<(), GraphError> {
        if self.nodes[parent].is_none() {
            return Err(GraphError::UnknownBone(parent));
        }
        if self.nodes[child].is_none() {
            return Err(GraphError::UnknownBone(child));
        }
        if self.edges[child].is_some() {
            return Err(GraphError::DuplicateParent { child });
        }
        // Walk up from the prospective parent; reaching the child (or the
        // trivial parent == child case) means a cycle.
        let mut cursor = Some(parent);
        while let Some(at) = cursor {
            if at == child {
                return Err(GraphError::Cycle { parent, child });
            }
            cursor = self.edges[at].map(|e| e.parent);
        }
        self.edges[child] = Some(SkeletonEdge {
            parent,
            child,
            kind,
        });
        if let Some(node) = self.nodes[child].as_mut() {
            node.parent = Some(parent);
        }
        Ok(())
    }

    /// Update the local pose of an existing bone.
    pub fn apply_pose(&mut self, kind: BoneKind, pose: Pose) -> Result<(), GraphError> {
        match self.nodes[kind].as_mut() {
            Some(node) => {
                node.pose = pose;
                Ok(())
            }
            None => Err(GraphError::UnknownBone(kind)),
        }
    }

    /// The node for `kind`, if present.
    pub fn node(&self, kind: BoneKind) -> Option<&SkeletonNode> {
        self.nodes[kind].as_ref()
    }

    /// The current local pose of `kind`, if present.
    pub fn pose(&self, kind: BoneKind) -> Option<Pose> {
        self.nodes[kind].map(|n| n.pose)
    }

    /// The incoming edge of `child`, if any.
    pub fn edge(&self, child: BoneKind) -> Option<&SkeletonEdge> {
        self.edges[child].as_ref()
    }

    /// Number of bones present.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|(_, n)| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(|(_, n)| n.is_none())
    }

    /// Bones with no incoming edge, in taxonomy order.
    pub fn roots(&self) -> impl Iterator<Item = BoneKind> + '_ {
        BoneKind::iter().filter(|&k| self.nodes[k].is_some() && self.edges[k].is_none())
    }

    /// Children of `parent` that are connected by an edge, in taxonomy
    /// order regardless of edge insertion order.
    pub fn children(&self, parent: BoneKind) -> impl Iterator<Item = BoneKind> + '_ {
        BoneKind::iter().filter(move |&k| {
            self.edges[k].map(|e| e.parent) == Some(parent)
        })
    }

    /// Immutable copy of the whole graph, safe to hand across tasks.
    pub fn snapshot(&self) -> Skeleton {
        self.clone()
    }

    /// Deterministic root-to-leaf pre-order traversal.
    ///
    /// Roots are visited in taxonomy order; within each subtree, children
    /// are visited in taxonomy order.
    pub fn traverse(&self) -> Traverse<'_> {
        let mut stack: Vec<BoneKind> = self.roots().collect();
        stack.reverse();
        Traverse {
            skeleton: self,
            stack,
        }
    }
}

/// Iterator returned by [`Skeleton::traverse`].
pub struct Traverse<'a> {
    skeleton: &'a Skeleton,
    stack: Vec<BoneKind>,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = &'a SkeletonNode;

    fn next(&mut self) -> Option<Self::Item> {
        let kind = self.stack.pop()?;
        let mut children: Vec<BoneKind> = self.skeleton.children(kind).collect();
        children.reverse();
        self.stack.extend(children);
        // Edges only exist between present nodes, so the unwrap holds.
        Some(self.skeleton.node(kind).unwrap())
    }
}
