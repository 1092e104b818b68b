//! Chunk key codec.
//!
//! A chunk key is a logical key (one or two hashes) followed by an 8 byte
//! suffix holding the bitwise complement of the chunk boundary id, big endian.

use byteorder::{BigEndian, ByteOrder};

use crate::Error;

/// Length of the boundary suffix of a chunk key
pub const CHUNK_ID_LENGTH: usize = 8;

/// Default hash length of logical keys
pub const HASH_LENGTH: usize = 32;

/// Splits chunk keys into their logical key and boundary id and composes them
/// back.
pub trait ChunkKeyCodec {
    /// Split `key` into logical key and boundary id
    fn split<'k>(&self, key: &'k [u8]) -> Result<(&'k [u8], u64), Error>;

    /// Compose a chunk key out of a logical key and a boundary id, the exact
    /// inverse of [ChunkKeyCodec::split]
    fn compose(&self, base_key: &[u8], boundary: u64) -> Vec<u8> {
        index_chunk_key(base_key, boundary)
    }
}

/// Append the complemented boundary suffix to `base_key`.
pub fn index_chunk_key(base_key: &[u8], boundary: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(base_key.len() + CHUNK_ID_LENGTH);
    key.extend_from_slice(base_key);
    let mut suffix = [0u8; CHUNK_ID_LENGTH];
    BigEndian::write_u64(&mut suffix, !boundary);
    key.extend_from_slice(&suffix);
    key
}

/// Codec for keys made of one or two hashes of `hash_length` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexChunkKeyCodec {
    hash_length: usize,
}

impl IndexChunkKeyCodec {
    /// Codec accepting keys of `hash_length + 8` and `2 * hash_length + 8`
    /// bytes
    pub const fn new(hash_length: usize) -> Self {
        IndexChunkKeyCodec { hash_length }
    }

    /// Hash length this codec was configured with
    pub fn hash_length(&self) -> usize {
        self.hash_length
    }

    fn single_key_length(&self) -> usize {
        self.hash_length + CHUNK_ID_LENGTH
    }

    fn double_key_length(&self) -> usize {
        2 * self.hash_length + CHUNK_ID_LENGTH
    }
}

impl Default for IndexChunkKeyCodec {
    fn default() -> Self {
        Self::new(HASH_LENGTH)
    }
}

impl ChunkKeyCodec for IndexChunkKeyCodec {
    fn split<'k>(&self, key: &'k [u8]) -> Result<(&'k [u8], u64), Error> {
        if key.len() != self.single_key_length() && key.len() != self.double_key_length() {
            return Err(Error::InvalidKeyLength {
                actual: key.len(),
                single: self.single_key_length(),
                double: self.double_key_length(),
            });
        }
        let (base_key, suffix) = key.split_at(key.len() - CHUNK_ID_LENGTH);
        Ok((base_key, !BigEndian::read_u64(suffix)))
    }
}
