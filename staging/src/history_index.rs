//! History index chunks.
//!
//! A chunk lists the block numbers at which an entity changed. It is staged as
//! a whole under a chunk key derived from the entity key.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use chunkstage_visualize::DebugBoundaries;

use crate::{boundaries::OPEN_CHUNK_ID, codec::index_chunk_key, Error};

const ELEMENT_LENGTH: usize = 8;

/// Serialized history index chunk as consumed by
/// [MutationBuffer::insert_index_chunk](crate::MutationBuffer::insert_index_chunk).
pub trait HistoryIndexChunk {
    /// Storage key of the chunk for `entity_key`. A chunk that is not final
    /// is the open chunk of the entity.
    fn key(&self, entity_key: &[u8], is_not_final: bool) -> Result<Vec<u8>, Error>;

    /// Lowest element of the chunk, `None` if the chunk is empty
    fn first_element(&self) -> Option<u64>;

    /// Serialized chunk
    fn as_bytes(&self) -> &[u8];
}

/// History index chunk encoded as ascending big endian `u64` elements.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HistoryIndexBytes(Vec<u8>);

impl HistoryIndexBytes {
    /// Empty chunk
    pub fn new() -> Self {
        Self::default()
    }

    /// Chunk holding `elements`, sorted and deduplicated
    pub fn from_elements(elements: impl IntoIterator<Item = u64>) -> Self {
        let mut elements: Vec<u64> = elements.into_iter().collect();
        elements.sort_unstable();
        elements.dedup();

        let mut bytes = vec![0u8; elements.len() * ELEMENT_LENGTH];
        for (element, slot) in elements.iter().zip(bytes.chunks_exact_mut(ELEMENT_LENGTH)) {
            BigEndian::write_u64(slot, *element);
        }
        HistoryIndexBytes(bytes)
    }

    /// Validate a serialized chunk
    pub fn decode(bytes: Vec<u8>) -> Result<Self, Error> {
        if bytes.len() % ELEMENT_LENGTH != 0 {
            return Err(Error::InvalidIndexChunk(format!(
                "length {} is not a multiple of {ELEMENT_LENGTH}",
                bytes.len()
            )));
        }
        let chunk = HistoryIndexBytes(bytes);
        let mut previous = None;
        for element in chunk.elements() {
            if previous.is_some_and(|p| p >= element) {
                return Err(Error::InvalidIndexChunk(format!(
                    "element {element} is out of order"
                )));
            }
            previous = Some(element);
        }
        Ok(chunk)
    }

    /// Append an element greater than every element already present
    pub fn append(&mut self, element: u64) -> Result<(), Error> {
        if let Some(last) = self.last_element() {
            if element <= last {
                return Err(Error::InvalidIndexChunk(format!(
                    "cannot append {element} after {last}"
                )));
            }
        }
        let mut slot = [0u8; ELEMENT_LENGTH];
        BigEndian::write_u64(&mut slot, element);
        self.0.extend_from_slice(&slot);
        Ok(())
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.0.len() / ELEMENT_LENGTH
    }

    /// True if the chunk has no elements
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Elements in ascending order
    pub fn elements(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.chunks_exact(ELEMENT_LENGTH).map(BigEndian::read_u64)
    }

    /// Highest element
    pub fn last_element(&self) -> Option<u64> {
        self.0
            .len()
            .checked_sub(ELEMENT_LENGTH)
            .map(|start| BigEndian::read_u64(&self.0[start..]))
    }

    /// Take the serialized chunk
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl HistoryIndexChunk for HistoryIndexBytes {
    fn key(&self, entity_key: &[u8], is_not_final: bool) -> Result<Vec<u8>, Error> {
        if is_not_final {
            return Ok(index_chunk_key(entity_key, OPEN_CHUNK_ID));
        }
        self.first_element()
            .map(|first| index_chunk_key(entity_key, first))
            .ok_or_else(|| Error::InvalidIndexChunk("no element to derive a key from".to_owned()))
    }

    fn first_element(&self) -> Option<u64> {
        self.0.get(..ELEMENT_LENGTH).map(BigEndian::read_u64)
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for HistoryIndexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HistoryIndexBytes")
            .field(&DebugBoundaries(self.elements().collect()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_elements_are_sorted_and_unique() {
        let chunk = HistoryIndexBytes::from_elements([30, 10, 20, 10]);
        assert_eq!(chunk.elements().collect::<Vec<_>>(), vec![10, 20, 30]);
        assert_eq!(chunk.len(), 3);
        assert_eq!(chunk.first_element(), Some(10));
        assert_eq!(chunk.last_element(), Some(30));
        assert_eq!(chunk.as_bytes().len(), 24);
        assert_eq!(format!("{chunk:?}"), "HistoryIndexBytes([10, 20, 30])");
    }

    #[test]
    fn test_empty_chunk() {
        let chunk = HistoryIndexBytes::new();
        assert!(chunk.is_empty());
        assert_eq!(chunk.first_element(), None);
        assert_eq!(chunk.last_element(), None);
        assert_matches!(chunk.key(b"entity", false), Err(Error::InvalidIndexChunk(_)));
        assert_eq!(
            chunk.key(b"entity", true).expect("open chunk key"),
            index_chunk_key(b"entity", OPEN_CHUNK_ID)
        );
    }

    #[test]
    fn test_final_chunk_key_uses_first_element() {
        let chunk = HistoryIndexBytes::from_elements([5, 9]);
        assert_eq!(
            chunk.key(b"entity", false).expect("final chunk key"),
            index_chunk_key(b"entity", 5)
        );
    }

    #[test]
    fn test_append_keeps_order() {
        let mut chunk = HistoryIndexBytes::new();
        chunk.append(3).expect("first element");
        chunk.append(8).expect("greater element");
        assert_matches!(chunk.append(8), Err(Error::InvalidIndexChunk(_)));
        assert_matches!(chunk.append(1), Err(Error::InvalidIndexChunk(_)));
        assert_eq!(chunk.elements().collect::<Vec<_>>(), vec![3, 8]);
    }

    #[test]
    fn test_decode_validates() {
        let bytes = HistoryIndexBytes::from_elements([1, 2]).into_bytes();
        let decoded = HistoryIndexBytes::decode(bytes.clone()).expect("valid chunk");
        assert_eq!(decoded.len(), 2);

        assert_matches!(
            HistoryIndexBytes::decode(bytes[..9].to_vec()),
            Err(Error::InvalidIndexChunk(_))
        );

        let mut reversed = bytes[8..].to_vec();
        reversed.extend_from_slice(&bytes[..8]);
        assert_matches!(
            HistoryIndexBytes::decode(reversed),
            Err(Error::InvalidIndexChunk(_))
        );
    }
}
