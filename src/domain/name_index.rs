//! Hash index over equipment names.
//!
//! The index is an accelerator, not a complete search structure. It files
//! each record under a hash of its full (case-folded) name and answers a
//! query by scanning only the bucket the query hashes to. A partial query
//! almost never lands in the same bucket as the name it is a substring of,
//! so callers must fall back to a full scan when the index misses.
//!
//! Buckets hold [`EquipmentId`]s rather than references, so the index stays
//! valid however the owning collection reallocates. Names never change after
//! insertion, so entries never need re-keying.

use crate::domain::{Equipment, EquipmentId};

const BUCKET_COUNT: usize = 1009;

/// A fixed-size chained hash table from equipment names to identifiers.
#[derive(Debug, Clone)]
pub struct NameIndex {
    buckets: Vec<Vec<EquipmentId>>,
    len: usize,
}

impl Default for NameIndex {
    fn default() -> Self {
        Self {
            buckets: vec![Vec::new(); BUCKET_COUNT],
            len: 0,
        }
    }
}

impl NameIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index over every record yielded by `items`.
    pub fn build<'a>(items: impl IntoIterator<Item = &'a Equipment>) -> Self {
        let mut index = Self::new();
        for item in items {
            index.insert(item);
        }
        index
    }

    /// Files a record under the hash of its current name.
    pub fn insert(&mut self, item: &Equipment) {
        self.buckets[bucket_of(item.name())].push(item.id());
        self.len += 1;
    }

    /// Number of indexed records.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the index is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the first record in the query's bucket whose name contains
    /// `query`, ignoring case.
    ///
    /// `resolve` maps an identifier back to its record. Identifiers that no
    /// longer resolve are skipped.
    pub fn find<'a, F>(&self, query: &str, resolve: F) -> Option<&'a Equipment>
    where
        F: Fn(EquipmentId) -> Option<&'a Equipment>,
    {
        let needle = query.to_lowercase();
        self.buckets[bucket_of(query)]
            .iter()
            .filter_map(|&id| resolve(id))
            .find(|item| contains_folded(item.name(), &needle))
    }
}

/// Case-insensitive substring test. `needle` must already be lower case.
pub(crate) fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// djb2 over the case-folded name.
fn bucket_of(name: &str) -> usize {
    let hash = name
        .to_lowercase()
        .bytes()
        .fold(5381_u32, |hash, byte| {
            hash.wrapping_shl(5)
                .wrapping_add(hash)
                .wrapping_add(u32::from(byte))
        });
    // u32 always fits in usize on supported targets
    usize::try_from(hash).unwrap_or_default() % BUCKET_COUNT
}
