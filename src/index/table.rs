//! Index implementation
//!
//! HashMap-based key directory. Locking is the engine's job.

use std::collections::HashMap;

/// Maps each live key to the offset of its most recent record
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Index {
    offsets: HashMap<Vec<u8>, u64>,
}

impl Index {
    /// Create a new empty Index
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset of the authoritative record for `key`
    pub fn get(&self, key: &[u8]) -> Option<u64> {
        self.offsets.get(key).copied()
    }

    /// Point `key` at `offset`, returning the previous offset
    pub fn set(&mut self, key: Vec<u8>, offset: u64) -> Option<u64> {
        self.offsets.insert(key, offset)
    }

    /// Drop `key`; removing an absent key is a no-op
    pub fn remove(&mut self, key: &[u8]) -> Option<u64> {
        self.offsets.remove(key)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.offsets.contains_key(key)
    }

    /// Apply the (key, new offset) pairs produced by a merge
    pub fn retarget(&mut self, moves: Vec<(Vec<u8>, u64)>) {
        for (key, offset) in moves {
            self.offsets.insert(key, offset);
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// All live keys in sorted order
    pub fn keys(&self) -> Vec<Vec<u8>> {
        let mut keys: Vec<Vec<u8>> = self.offsets.keys().cloned().collect();
        keys.sort();
        keys
    }
}
