//! Chunk boundaries per logical key

use std::{collections::BTreeMap, fmt};

use chunkstage_visualize::{DebugBoundaries, DebugBytes};

/// Boundary id of the chunk that is still accumulating and has no upper
/// bound.
pub const OPEN_CHUNK_ID: u64 = u64::MAX;

/// Sorted, deduplicated chunk boundary ids of every logical key staged into
/// an index bucket.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ChunkBoundaryIndex {
    boundaries: BTreeMap<Vec<u8>, Vec<u64>>,
}

impl ChunkBoundaryIndex {
    /// Create empty boundary index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register boundary `id` for `logical_key`. Returns `false` if it was
    /// already known.
    pub fn register(&mut self, logical_key: &[u8], id: u64) -> bool {
        let Some(ids) = self.boundaries.get_mut(logical_key) else {
            self.boundaries.insert(logical_key.to_vec(), vec![id]);
            return true;
        };
        match ids.binary_search(&id) {
            Ok(_) => false,
            Err(position) => {
                ids.insert(position, id);
                true
            }
        }
    }

    /// Ascending boundary ids of `logical_key`
    pub fn get(&self, logical_key: &[u8]) -> Option<&[u64]> {
        self.boundaries.get(logical_key).map(Vec::as_slice)
    }

    /// Number of logical keys with at least one boundary
    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    /// Emptiness predicate
    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// Logical keys with their boundaries, in key order
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u64])> {
        self.boundaries
            .iter()
            .map(|(key, ids)| (key.as_slice(), ids.as_slice()))
    }
}

impl fmt::Debug for ChunkBoundaryIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.boundaries
                    .iter()
                    .map(|(key, ids)| (DebugBytes(key.clone()), DebugBoundaries(ids.clone()))),
            )
            .finish()
    }
}
