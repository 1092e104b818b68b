// MIT LICENSE
//
// Copyright (c) 2021 Dash Core Group
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! Mutation buffer holding the pending writes of one transaction.

use std::{
    collections::{btree_map, BTreeMap},
    fmt,
};

use chunkstage_costs::{
    cost_return_on_error_no_add, CostContext, CostResult, CostsExt, OperationCost,
};
use chunkstage_visualize::{to_hex, DebugBytes};
use tracing::{debug, error, trace};

use crate::{
    boundaries::{ChunkBoundaryIndex, OPEN_CHUNK_ID},
    bucket::{BucketBuffer, Staged, StagedOperation},
    classifier::{IndexBucketClassifier, IndexBuckets},
    codec::{ChunkKeyCodec, IndexChunkKeyCodec},
    history_index::HistoryIndexChunk,
    Error,
};

/// Chunk picked by [MutationBuffer::resolve_chunk].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChunk<'a> {
    /// Full storage key of the chunk
    pub chunk_key: Vec<u8>,
    /// Boundary id the chunk key was composed with
    pub boundary: u64,
    /// Staged chunk, `None` if the chunk is staged as deleted
    pub index: Option<&'a [u8]>,
}

/// Pending writes of one transaction, grouped by bucket.
///
/// Writes into index buckets also register the chunk boundary encoded in the
/// key, so that [MutationBuffer::resolve_chunk] can find the staged chunk
/// covering a block number without scanning the bucket. The buffer is owned by
/// a single writer and consumed by [MutationBuffer::into_buckets] when flushed.
pub struct MutationBuffer<C = IndexChunkKeyCodec, I = IndexBuckets> {
    buckets: BTreeMap<Vec<u8>, BucketBuffer>,
    boundaries: ChunkBoundaryIndex,
    codec: C,
    classifier: I,
}

impl MutationBuffer {
    /// Buffer treating `index_buckets` as index buckets, with the default
    /// chunk key codec.
    pub fn with_index_buckets<B: AsRef<[u8]>>(index_buckets: impl IntoIterator<Item = B>) -> Self {
        Self::new(
            IndexChunkKeyCodec::default(),
            index_buckets.into_iter().collect(),
        )
    }
}

impl Default for MutationBuffer {
    fn default() -> Self {
        Self::new(IndexChunkKeyCodec::default(), IndexBuckets::history())
    }
}

impl<C: ChunkKeyCodec, I: IndexBucketClassifier> MutationBuffer<C, I> {
    /// Create empty buffer.
    pub fn new(codec: C, classifier: I) -> Self {
        MutationBuffer {
            buckets: BTreeMap::new(),
            boundaries: ChunkBoundaryIndex::new(),
            codec,
            classifier,
        }
    }

    /// Stage `value` under `key` in `bucket`.
    pub fn put<K: AsRef<[u8]>>(
        &mut self,
        bucket: &[u8],
        key: K,
        value: Vec<u8>,
    ) -> CostResult<(), Error> {
        self.stage(bucket, key.as_ref(), StagedOperation::Put(value))
    }

    /// Stage a tombstone under `key` in `bucket`.
    pub fn delete<K: AsRef<[u8]>>(&mut self, bucket: &[u8], key: K) -> CostResult<(), Error> {
        self.stage(bucket, key.as_ref(), StagedOperation::Delete)
    }

    fn stage(
        &mut self,
        bucket: &[u8],
        key: &[u8],
        operation: StagedOperation,
    ) -> CostResult<(), Error> {
        let mut cost = OperationCost::default();

        // Split before touching anything so a bad key leaves no trace.
        let chunk = if self.classifier.is_index_bucket(bucket) {
            Some(cost_return_on_error_no_add!(cost, self.codec.split(key)))
        } else {
            None
        };

        trace!(bucket = %to_hex(bucket), key = %to_hex(key), ?operation, "staging");

        let target = self.buckets.entry(bucket.to_vec()).or_insert_with(|| {
            debug!(bucket = %to_hex(bucket), "new bucket buffer");
            BucketBuffer::new()
        });
        target
            .stage(key.to_vec(), operation)
            .unwrap_add_cost(&mut cost);

        if let Some((logical_key, boundary)) = chunk {
            if self.boundaries.register(logical_key, boundary) {
                trace!(key = %to_hex(logical_key), boundary, "registered chunk boundary");
                cost.boundary_writes += 1;
            }
        }

        Ok(()).wrap_with_cost(cost)
    }

    /// Look up what is staged for `key` in `bucket`. Does not consult the
    /// boundary index.
    pub fn get<K: AsRef<[u8]>>(&self, bucket: &[u8], key: K) -> CostContext<Staged<'_>> {
        let Some(target) = self.buckets.get(bucket) else {
            return Staged::Absent.wrap_with_cost(OperationCost::default());
        };
        target.get(key.as_ref()).wrap_fn_cost(|staged| OperationCost {
            seek_count: 1,
            loaded_bytes: staged.value().map_or(0, |v| v.len() as u64),
            ..Default::default()
        })
    }

    /// Total number of staged keys across all buckets. Overwrites of a key
    /// are counted once.
    pub fn len(&self) -> usize {
        self.buckets.values().map(BucketBuffer::len).sum()
    }

    /// Emptiness predicate
    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(BucketBuffer::is_empty)
    }

    /// Staged writes of `bucket`
    pub fn bucket(&self, bucket: &[u8]) -> Option<&BucketBuffer> {
        self.buckets.get(bucket)
    }

    /// Buckets with staged writes, in name order
    pub fn buckets(&self) -> impl Iterator<Item = (&[u8], &BucketBuffer)> {
        self.buckets
            .iter()
            .map(|(name, target)| (name.as_slice(), target))
    }

    /// Ascending chunk boundaries registered for `logical_key`
    pub fn boundaries(&self, logical_key: &[u8]) -> Option<&[u64]> {
        self.boundaries.get(logical_key)
    }

    /// Boundary index of every index bucket write staged so far
    pub fn boundary_index(&self) -> &ChunkBoundaryIndex {
        &self.boundaries
    }

    /// Stage a serialized history index chunk of `entity_key` into `bucket`,
    /// see [stage_index_chunk]. The bucket is not classified and the key is not
    /// split; the boundary is registered under `entity_key` as given.
    pub fn insert_index_chunk<H: HistoryIndexChunk + ?Sized>(
        &mut self,
        bucket: &[u8],
        entity_key: &[u8],
        chunk: &H,
    ) -> CostResult<(), Error> {
        if let Some(target) = self.buckets.get_mut(bucket) {
            return stage_index_chunk(target, &mut self.boundaries, entity_key, chunk);
        }

        let mut target = BucketBuffer::new();
        let result = stage_index_chunk(&mut target, &mut self.boundaries, entity_key, chunk);
        if result.value.is_ok() {
            debug!(bucket = %to_hex(bucket), "new bucket buffer");
            self.buckets.insert(bucket.to_vec(), target);
        }
        result
    }

    /// Find the staged chunk of `key` that covers block `timestamp`.
    ///
    /// An exact boundary match wins. Otherwise the open chunk covers every
    /// timestamp, and without an open chunk a timestamp past the last
    /// boundary belongs to the last chunk. Anything else is
    /// [Error::NotFound] and has to be looked up in durable storage.
    pub fn resolve_chunk(
        &self,
        bucket: &[u8],
        key: &[u8],
        timestamp: u64,
    ) -> CostResult<ResolvedChunk<'_>, Error> {
        let mut cost = OperationCost::with_seek_count(1);

        let Some(boundaries) = self.boundaries.get(key) else {
            return Err(Error::NotFound).wrap_with_cost(cost);
        };

        let boundary = if boundaries.binary_search(&timestamp).is_ok() {
            timestamp
        } else {
            match boundaries.last() {
                Some(&last) if last == OPEN_CHUNK_ID || timestamp > last => last,
                _ => {
                    debug!(
                        key = %to_hex(key),
                        timestamp,
                        "no staged chunk covers timestamp"
                    );
                    return Err(Error::NotFound).wrap_with_cost(cost);
                }
            }
        };

        let chunk_key = self.codec.compose(key, boundary);
        let index = match self.get(bucket, &chunk_key).unwrap_add_cost(&mut cost) {
            Staged::Present(index) => Some(index),
            Staged::Tombstone => None,
            Staged::Absent => {
                error!(
                    bucket = %to_hex(bucket),
                    key = %to_hex(key),
                    boundary,
                    "chunk boundary registered without a staged chunk"
                );
                return Err(Error::InconsistentIndex {
                    key: hex::encode(key),
                    boundary,
                })
                .wrap_with_cost(cost);
            }
        };

        debug!(key = %to_hex(key), timestamp, boundary, "resolved staged chunk");
        Ok(ResolvedChunk {
            chunk_key,
            boundary,
            index,
        })
        .wrap_with_cost(cost)
    }

    /// Consume the buffer, yielding the staged writes of every bucket in name
    /// order for the flush into durable storage.
    pub fn into_buckets(self) -> btree_map::IntoIter<Vec<u8>, BucketBuffer> {
        self.buckets.into_iter()
    }
}

/// Stage a serialized history index chunk of `entity_key` into a caller
/// supplied bucket buffer and register its first element as a boundary of
/// `entity_key`.
///
/// Nothing is modified unless the chunk produces a key and has at least one
/// element.
pub fn stage_index_chunk<H: HistoryIndexChunk + ?Sized>(
    target: &mut BucketBuffer,
    boundaries: &mut ChunkBoundaryIndex,
    entity_key: &[u8],
    chunk: &H,
) -> CostResult<(), Error> {
    let mut cost = OperationCost::default();

    let chunk_key = cost_return_on_error_no_add!(
        cost,
        chunk.key(entity_key, false).map_err(|e| match e {
            Error::InvalidIndexChunk(_) => e,
            other => Error::InvalidIndexChunk(other.to_string()),
        })
    );
    let Some(first) = chunk.first_element() else {
        return Err(Error::EmptyIndexChunk).wrap_with_cost(cost);
    };

    target
        .put(chunk_key, chunk.as_bytes().to_vec())
        .unwrap_add_cost(&mut cost);
    if boundaries.register(entity_key, first) {
        trace!(key = %to_hex(entity_key), boundary = first, "registered chunk boundary");
        cost.boundary_writes += 1;
    }

    Ok(()).wrap_with_cost(cost)
}

impl<C, I> fmt::Debug for MutationBuffer<C, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationBuffer")
            .field(
                "buckets",
                &self
                    .buckets
                    .iter()
                    .map(|(name, target)| (DebugBytes(name.clone()), target))
                    .collect::<BTreeMap<_, _>>(),
            )
            .field("boundaries", &self.boundaries)
            .finish()
    }
}
