//! Total mapping from [`BoneKind`] to a value.
//!
//! Backed by a fixed array indexed by the bone's taxonomy code, so every
//! bone always has an entry and lookups cannot fail. Construction from a
//! partial mapping is the only fallible operation.

use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use crate::bone::{BoneKind, DecodeError};

/// Total map from every [`BoneKind`] to a `T`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoneMap<T>([T; BoneKind::NUM_KINDS]);

impl<T> BoneMap<T> {
    /// Wrap a complete array, indexed in taxonomy order.
    pub const fn new(values: [T; BoneKind::NUM_KINDS]) -> Self {
        Self(values)
    }

    /// Build a map by evaluating `f` for every bone in taxonomy order.
    pub fn from_fn(mut f: impl FnMut(BoneKind) -> T) -> Self {
        Self(std::array::from_fn(|i| {
            f(BoneKind::try_from(i).unwrap())
        }))
    }

    /// Map every value, preserving totality.
    pub fn map<U>(self, mut f: impl FnMut(BoneKind, T) -> U) -> BoneMap<U> {
        let mut iter = self.0.into_iter().enumerate();
        BoneMap(std::array::from_fn(|_| {
            let (i, value) = iter.next().unwrap();
            f(BoneKind::try_from(i).unwrap(), value)
        }))
    }

    /// Iterate `(kind, &value)` pairs in taxonomy order.
    pub fn iter(&self) -> impl Iterator<Item = (BoneKind, &T)> {
        self.0.iter().enumerate().map(index_pair)
    }

    /// Iterate `(kind, &mut value)` pairs in taxonomy order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BoneKind, &mut T)> {
        self.0.iter_mut().enumerate().map(index_pair)
    }
}

fn index_pair<T>((i, value): (usize, T)) -> (BoneKind, T) {
    // Array length equals the taxonomy size, so the index always decodes.
    (BoneKind::try_from(i).unwrap(), value)
}

impl<T> Index<BoneKind> for BoneMap<T> {
    type Output = T;

    fn index(&self, kind: BoneKind) -> &T {
        &self.0[usize::from(kind)]
    }
}

impl<T> IndexMut<BoneKind> for BoneMap<T> {
    fn index_mut(&mut self, kind: BoneKind) -> &mut T {
        &mut self.0[usize::from(kind)]
    }
}

impl<T> IntoIterator for BoneMap<T> {
    type Item = (BoneKind, T);
    type IntoIter = std::iter::Map<
        std::iter::Enumerate<std::array::IntoIter<T, { BoneKind::NUM_KINDS }>>,
        fn((usize, T)) -> (BoneKind, T),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.0
            .into_iter()
            .enumerate()
            .map(index_pair as fn((usize, T)) -> (BoneKind, T))
    }
}

impl<T> TryFrom<HashMap<BoneKind, T>> for BoneMap<T> {
    type Error = DecodeError;

    /// Fails with [`DecodeError::MissingBone`] naming the first absent
    /// bone in taxonomy order.
    fn try_from(mut partial: HashMap<BoneKind, T>) -> Result<Self, Self::Error> {
        let mut staged: BoneMap<Option<T>> = BoneMap::from_fn(|_| None);
        for (kind, value) in partial.drain() {
            staged[kind] = Some(value);
        }
        for (kind, slot) in staged.iter() {
            if slot.is_none() {
                return Err(DecodeError::MissingBone(kind));
            }
        }
        Ok(staged.map(|_, slot| slot.unwrap()))
    }
}
