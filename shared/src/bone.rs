//! Bone taxonomy for the Kinlink skeleton.
//!
//! The taxonomy is a closed, totally ordered set of skeletal locations.
//! Wire protocols and storage index bones by their `u8` code, so the
//! discriminant values are part of the wire format and must never be
//! reordered.

use thiserror::Error;

/// Errors produced by taxonomy conversions and total-map construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A numeric bone code outside the taxonomy range.
    #[error("unknown bone code {0}")]
    UnknownBoneCode(u8),
    /// A numeric edge-kind code outside the enumerated range.
    #[error("unknown edge kind code {0}")]
    UnknownEdgeKind(u8),
    /// A partial mapping was missing an entry for this bone.
    #[error("missing entry for bone {0:?}")]
    MissingBone(BoneKind),
}

/// One member of the fixed skeletal-location taxonomy.
///
/// Codes are assigned in taxonomy order starting at the root. Iteration
/// and traversal orders throughout the workspace are defined by this
/// ordering, never by insertion order.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoneKind {
    Head = 0,
    Neck,
    Chest,
    Waist,
    Hip,
    ThighL,
    ThighR,
    AnkleL,
    AnkleR,
    FootL,
    FootR,
    UpperArmL,
    UpperArmR,
    ForearmL,
    ForearmR,
    WristL,
    WristR,
}

impl BoneKind {
    /// The bone with the smallest code.
    pub const MIN: BoneKind = BoneKind::Head;

    /// The bone with the largest code.
    pub const MAX: BoneKind = BoneKind::WristR;

    /// The root of the default kinematic hierarchy.
    pub const ROOT: BoneKind = BoneKind::Head;

    /// Number of bones in the taxonomy.
    pub const NUM_KINDS: usize = BoneKind::MAX as usize + 1;

    /// All bones in taxonomy order.
    ///
    /// The returned iterator is finite and restartable.
    pub fn iter() -> impl Iterator<Item = BoneKind> {
        (0..Self::NUM_KINDS as u8).map(|code| {
            // Range is closed; every code below NUM_KINDS decodes.
            BoneKind::try_from(code).unwrap()
        })
    }

    /// Parent in the default kinematic hierarchy, `None` for the root.
    pub const fn parent(&self) -> Option<BoneKind> {
        use BoneKind::*;
        Some(match self {
            Head => return None,
            Neck => Head,
            Chest => Neck,
            Waist => Chest,
            Hip => Waist,
            ThighL => Hip,
            ThighR => Hip,
            AnkleL => ThighL,
            AnkleR => ThighR,
            FootL => AnkleL,
            FootR => AnkleR,
            UpperArmL => Neck,
            UpperArmR => Neck,
            ForearmL => UpperArmL,
            ForearmR => UpperArmR,
            WristL => ForearmL,
            WristR => ForearmR,
        })
    }

    /// Children in the default kinematic hierarchy, in taxonomy order.
    pub const fn children(&self) -> &'static [BoneKind] {
        use BoneKind::*;
        match self {
            Head => &[Neck],
            Neck => &[Chest, UpperArmL, UpperArmR],
            Chest => &[Waist],
            Waist => &[Hip],
            Hip => &[ThighL, ThighR],
            ThighL => &[AnkleL],
            ThighR => &[AnkleR],
            AnkleL => &[FootL],
            AnkleR => &[FootR],
            FootL => &[],
            FootR => &[],
            UpperArmL => &[ForearmL],
            UpperArmR => &[ForearmR],
            ForearmL => &[WristL],
            ForearmR => &[WristR],
            WristL => &[],
            WristR => &[],
        }
    }
}

impl TryFrom<u8> for BoneKind {
    type Error = DecodeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        use BoneKind::*;
        Ok(match code {
            0 => Head,
            1 => Neck,
            2 => Chest,
            3 => Waist,
            4 => Hip,
            5 => ThighL,
            6 => ThighR,
            7 => AnkleL,
            8 => AnkleR,
            9 => FootL,
            10 => FootR,
            11 => UpperArmL,
            12 => UpperArmR,
            13 => ForearmL,
            14 => ForearmR,
            15 => WristL,
            16 => WristR,
            other => return Err(DecodeError::UnknownBoneCode(other)),
        })
    }
}

impl TryFrom<usize> for BoneKind {
    type Error = DecodeError;

    fn try_from(code: usize) -> Result<Self, Self::Error> {
        u8::try_from(code)
            .map_err(|_| DecodeError::UnknownBoneCode(u8::MAX))
            .and_then(BoneKind::try_from)
    }
}

impl From<BoneKind> for u8 {
    fn from(kind: BoneKind) -> Self {
        kind as u8
    }
}

impl From<BoneKind> for usize {
    fn from(kind: BoneKind) -> Self {
        kind as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip_all_kinds() {
        for kind in BoneKind::iter() {
            let code = u8::from(kind);
            assert_eq!(BoneKind::try_from(code), Ok(kind));
        }
    }

    #[test]
    fn test_out_of_range_codes_fail() {
        for code in BoneKind::NUM_KINDS as u8..=u8::MAX {
            assert_eq!(
                BoneKind::try_from(code),
                Err(DecodeError::UnknownBoneCode(code))
            );
        }
    }

    #[test]
    fn test_iter_is_taxonomy_ordered_and_complete() {
        let kinds: Vec<BoneKind> = BoneKind::iter().collect();
        assert_eq!(kinds.len(), BoneKind::NUM_KINDS);
        assert_eq!(kinds[0], BoneKind::ROOT);
        assert!(kinds.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_parent_children_tables_agree() {
        for kind in BoneKind::iter() {
            for &child in kind.children() {
                assert_eq!(child.parent(), Some(kind));
            }
            if let Some(parent) = kind.parent() {
                assert!(parent.children().contains(&kind));
            }
        }
    }

    #[test]
    fn test_children_in_taxonomy_order() {
        for kind in BoneKind::iter() {
            let children = kind.children();
            assert!(children.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_root_has_no_parent() {
        assert_eq!(BoneKind::ROOT.parent(), None);
        let roots = BoneKind::iter().filter(|k| k.parent().is_none()).count();
        assert_eq!(roots, 1);
    }
}
