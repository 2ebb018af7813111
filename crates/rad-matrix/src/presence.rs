//! Maps from original row or column indices to a kept flag.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Original index to "kept after compression" flag.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresenceMap(BTreeMap<usize, bool>);

impl PresenceMap {
    /// Creates a map from flags listed in index order.
    pub fn from_flags(flags: impl IntoIterator<Item = bool>) -> Self {
        Self(flags.into_iter().enumerate().collect())
    }

    /// Number of original indices.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the map covers no indices.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of kept indices.
    pub fn present_count(&self) -> usize {
        self.0.values().filter(|kept| **kept).count()
    }

    /// Kept original indices, ascending.
    pub fn present_indices(&self) -> Vec<usize> {
        self.0
            .iter()
            .filter_map(|(idx, kept)| kept.then_some(*idx))
            .collect()
    }

    /// Flag for one original index.
    pub fn get(&self, idx: usize) -> Option<bool> {
        self.0.get(&idx).copied()
    }

    /// Sets the flag for one original index.
    pub fn insert(&mut self, idx: usize, kept: bool) {
        self.0.insert(idx, kept);
    }

    /// Iterates `(index, kept)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, bool)> + '_ {
        self.0.iter().map(|(idx, kept)| (*idx, *kept))
    }

    /// True when the indices are exactly `0..len`.
    pub fn is_dense(&self) -> bool {
        self.0.keys().enumerate().all(|(pos, idx)| pos == *idx)
    }
}

impl FromIterator<(usize, bool)> for PresenceMap {
    fn from_iter<I: IntoIterator<Item = (usize, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
