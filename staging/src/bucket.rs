//! Staged writes of a single bucket

use std::{
    collections::{btree_map, BTreeMap},
    fmt,
};

use chunkstage_costs::{CostContext, CostsExt, OperationCost};
use chunkstage_visualize::{visualize_to_vec, DebugBytes};

/// Deferred write of one key.
#[derive(Clone, PartialEq, Eq)]
pub enum StagedOperation {
    /// Deferred put, an empty value is still a value
    Put(Vec<u8>),
    /// Deferred delete (tombstone)
    Delete,
}

impl StagedOperation {
    fn value_len(&self) -> u64 {
        match self {
            StagedOperation::Put(value) => value.len() as u64,
            StagedOperation::Delete => 0,
        }
    }
}

impl fmt::Debug for StagedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StagedOperation::Put(value) => {
                let mut value_buf = Vec::new();
                visualize_to_vec(&mut value_buf, value.as_slice());
                f.debug_tuple("Put")
                    .field(&String::from_utf8_lossy(&value_buf))
                    .finish()
            }
            StagedOperation::Delete => f.write_str("Delete"),
        }
    }
}

/// Outcome of looking a key up in staged state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staged<'a> {
    /// Never staged, the caller should read durable storage
    Absent,
    /// Staged as deleted, durable storage must not be consulted
    Tombstone,
    /// Staged value
    Present(&'a [u8]),
}

impl<'a> Staged<'a> {
    /// True unless the key was never staged
    pub fn is_staged(&self) -> bool {
        !matches!(self, Staged::Absent)
    }

    /// True if the key is staged as deleted
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Staged::Tombstone)
    }

    /// Staged value, `None` for both absent keys and tombstones
    pub fn value(&self) -> Option<&'a [u8]> {
        match *self {
            Staged::Present(value) => Some(value),
            Staged::Absent | Staged::Tombstone => None,
        }
    }
}

impl<'a> From<Option<&'a StagedOperation>> for Staged<'a> {
    fn from(operation: Option<&'a StagedOperation>) -> Self {
        match operation {
            None => Staged::Absent,
            Some(StagedOperation::Delete) => Staged::Tombstone,
            Some(StagedOperation::Put(value)) => Staged::Present(value),
        }
    }
}

/// Deferred operations of one bucket, keyed by full storage key.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BucketBuffer {
    operations: BTreeMap<Vec<u8>, StagedOperation>,
}

impl BucketBuffer {
    /// Create empty bucket buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of staged keys
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Emptiness predicate
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Stage `value` under `key`, replacing whatever was staged before
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> CostContext<()> {
        self.stage(key, StagedOperation::Put(value))
    }

    /// Stage a tombstone under `key`
    pub fn delete(&mut self, key: Vec<u8>) -> CostContext<()> {
        self.stage(key, StagedOperation::Delete)
    }

    pub(crate) fn stage(&mut self, key: Vec<u8>, operation: StagedOperation) -> CostContext<()> {
        let mut cost = OperationCost {
            seek_count: 1,
            written_bytes: key.len() as u64 + operation.value_len(),
            ..Default::default()
        };
        if let Some(previous) = self.operations.insert(key, operation) {
            cost.freed_bytes += previous.value_len();
        }
        ().wrap_with_cost(cost)
    }

    /// Look `key` up
    pub fn get(&self, key: &[u8]) -> Staged<'_> {
        self.operations.get(key).into()
    }

    /// Staged operations in key order
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &StagedOperation)> {
        self.operations
            .iter()
            .map(|(key, operation)| (key.as_slice(), operation))
    }
}

impl IntoIterator for BucketBuffer {
    type IntoIter = btree_map::IntoIter<Vec<u8>, StagedOperation>;
    type Item = (Vec<u8>, StagedOperation);

    fn into_iter(self) -> Self::IntoIter {
        self.operations.into_iter()
    }
}

impl fmt::Debug for BucketBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.operations
                    .iter()
                    .map(|(key, operation)| (DebugBytes(key.clone()), operation)),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tombstone_is_not_absent() {
        let mut bucket = BucketBuffer::new();
        bucket.put(b"a".to_vec(), b"1".to_vec()).unwrap();
        bucket.delete(b"b".to_vec()).unwrap();
        bucket.put(b"c".to_vec(), Vec::new()).unwrap();

        assert_eq!(bucket.get(b"a"), Staged::Present(b"1"));
        assert_eq!(bucket.get(b"b"), Staged::Tombstone);
        assert_eq!(bucket.get(b"c"), Staged::Present(b""));
        assert_eq!(bucket.get(b"d"), Staged::Absent);

        assert!(bucket.get(b"b").is_staged());
        assert!(bucket.get(b"b").is_tombstone());
        assert!(!bucket.get(b"d").is_staged());
        assert_eq!(bucket.get(b"c").value(), Some(&b""[..]));
        assert_eq!(bucket.get(b"b").value(), None);
    }

    #[test]
    fn test_overwrite_counts_once_and_reports_freed_bytes() {
        let mut bucket = BucketBuffer::new();
        let first = bucket.put(b"key".to_vec(), b"value".to_vec());
        assert_eq!(first.cost.written_bytes, 8);
        assert_eq!(first.cost.freed_bytes, 0);

        let second = bucket.put(b"key".to_vec(), b"v2".to_vec());
        assert_eq!(second.cost.written_bytes, 5);
        assert_eq!(second.cost.freed_bytes, 5);

        let third = bucket.delete(b"key".to_vec());
        assert_eq!(third.cost.written_bytes, 3);
        assert_eq!(third.cost.freed_bytes, 2);

        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket.get(b"key"), Staged::Tombstone);
    }

    #[test]
    fn test_iteration_is_key_ordered() {
        let mut bucket = BucketBuffer::new();
        bucket.put(b"b".to_vec(), b"2".to_vec()).unwrap();
        bucket.delete(b"a".to_vec()).unwrap();

        let keys: Vec<&[u8]> = bucket.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec![&b"a"[..], &b"b"[..]]);

        let operations: Vec<_> = bucket.into_iter().collect();
        assert_eq!(
            operations,
            vec![
                (b"a".to_vec(), StagedOperation::Delete),
                (b"b".to_vec(), StagedOperation::Put(b"2".to_vec())),
            ]
        );
    }

    #[test]
    fn test_debug_output() {
        let mut bucket = BucketBuffer::new();
        bucket.put(b"key1".to_vec(), b"value1".to_vec()).unwrap();
        bucket.delete(b"key2".to_vec()).unwrap();
        assert_eq!(
            format!("{bucket:?}"),
            "{[hex: 6b657931, str: key1]: Put(\"[hex: 76616c756531, str: value1]\"), [hex: \
             6b657932, str: key2]: Delete}"
        );
    }

    #[test]
    fn test_debug_keeps_newlines_in_values() {
        let operation = StagedOperation::Put(b"a\nb".to_vec());
        assert_eq!(
            format!("{operation:?}"),
            "Put(\"[hex: 610a62, str: a\\nb]\")"
        );
    }
}
