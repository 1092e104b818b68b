#![deny(missing_docs)]

//! Write-side staging of a bucketed key value store.
//!
//! Pending writes of a transaction are kept per bucket until they are flushed
//! to durable storage. Keys of index buckets carry a chunk boundary suffix;
//! the buffer keeps the boundaries of every logical key so that the staged
//! history chunk covering a block number can be found directly.

pub mod boundaries;
pub mod bucket;
pub mod classifier;
pub mod codec;
pub mod error;
pub mod history_index;
mod mutation;

pub use chunkstage_costs::{CostContext, CostResult, OperationCost};

pub use crate::{
    boundaries::{ChunkBoundaryIndex, OPEN_CHUNK_ID},
    bucket::{BucketBuffer, Staged, StagedOperation},
    classifier::{IndexBucketClassifier, IndexBuckets},
    codec::{index_chunk_key, ChunkKeyCodec, IndexChunkKeyCodec},
    error::Error,
    history_index::{HistoryIndexBytes, HistoryIndexChunk},
    mutation::{stage_index_chunk, MutationBuffer, ResolvedChunk},
};
