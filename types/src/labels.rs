use ahash::AHashMap;
use std::hash::Hash;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Dense integer id assigned to a vertex label the first time it is seen.
///
/// Both source and target graphs use this type; the caller tells them apart
/// by which `LabelTable` minted the id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DenseId(pub u32);

impl DenseId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for DenseId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Insertion-ordered bidirectional mapping from arbitrary hashable user
/// labels to dense ids in `[0, len())`.
///
/// Strategy per the design notes: an open-addressed hash from label to id
/// (here `AHashMap`, since labels are an internal detail never exposed to
/// an attacker-controlled hash-flooding surface) plus a vector from id back
/// to label. Insertion order is preserved because ids are handed out
/// sequentially.
#[derive(Debug, Clone, Default)]
pub struct LabelTable<L: Hash + Eq + Clone> {
    forward: AHashMap<L, DenseId>,
    backward: Vec<L>,
}

impl<L: Hash + Eq + Clone> LabelTable<L> {
    pub fn new() -> Self {
        Self {
            forward: AHashMap::new(),
            backward: Vec::new(),
        }
    }

    /// Returns the existing id for `label`, or mints a fresh one.
    pub fn intern(&mut self, label: L) -> DenseId {
        if let Some(&id) = self.forward.get(&label) {
            return id;
        }
        let id = DenseId(self.backward.len() as u32);
        self.backward.push(label.clone());
        self.forward.insert(label, id);
        id
    }

    pub fn get(&self, label: &L) -> Option<DenseId> {
        self.forward.get(label).copied()
    }

    pub fn label(&self, id: DenseId) -> Option<&L> {
        self.backward.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.backward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backward.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DenseId, &L)> {
        self.backward
            .iter()
            .enumerate()
            .map(|(i, l)| (DenseId(i as u32), l))
    }
}
