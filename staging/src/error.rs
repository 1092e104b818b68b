//! Staging errors

/// Errors returned by the mutation buffer and its collaborators
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Nothing staged answers the query, the caller should consult durable
    /// storage
    #[error("not found in staged mutations")]
    NotFound,
    /// The boundary index references a chunk that is not staged in the bucket
    /// buffer
    #[error("inconsistent chunk index: boundary {boundary} of {key} has no staged chunk")]
    InconsistentIndex {
        /// Hex of the logical key
        key: String,
        /// Registered boundary id without a staged chunk
        boundary: u64,
    },
    /// An index chunk without elements cannot be assigned a boundary
    #[error("empty index chunk")]
    EmptyIndexChunk,
    /// The chunk could not produce its storage key or could not be decoded
    #[error("invalid index chunk: {0}")]
    InvalidIndexChunk(String),
    /// A chunk key has neither of the accepted lengths
    #[error("invalid chunk key length {actual}, expected {single} or {double}")]
    InvalidKeyLength {
        /// Length of the rejected key
        actual: usize,
        /// Accepted length for a single hash key
        single: usize,
        /// Accepted length for a double hash key
        double: usize,
    },
}

impl Error {
    /// True if the error means "fall through to durable storage"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}
