//! Index bucket classification

use std::collections::BTreeSet;

/// Bucket holding account history indices
pub const ACCOUNTS_HISTORY_BUCKET: &[u8] = b"hAT";

/// Bucket holding storage history indices
pub const STORAGE_HISTORY_BUCKET: &[u8] = b"hST";

/// Decides whether a bucket stores chunked history indices.
pub trait IndexBucketClassifier {
    /// True if keys of `bucket` carry a chunk boundary suffix
    fn is_index_bucket(&self, bucket: &[u8]) -> bool;
}

impl<F> IndexBucketClassifier for F
where
    F: Fn(&[u8]) -> bool,
{
    fn is_index_bucket(&self, bucket: &[u8]) -> bool {
        self(bucket)
    }
}

/// Fixed set of index bucket names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexBuckets(BTreeSet<Vec<u8>>);

impl IndexBuckets {
    /// No bucket is an index bucket
    pub fn new() -> Self {
        Self::default()
    }

    /// Account and storage history buckets
    pub fn history() -> Self {
        [ACCOUNTS_HISTORY_BUCKET, STORAGE_HISTORY_BUCKET]
            .into_iter()
            .collect()
    }

    /// Mark `bucket` as an index bucket
    pub fn insert(&mut self, bucket: impl AsRef<[u8]>) {
        self.0.insert(bucket.as_ref().to_vec());
    }
}

impl<B: AsRef<[u8]>> FromIterator<B> for IndexBuckets {
    fn from_iter<T: IntoIterator<Item = B>>(iter: T) -> Self {
        IndexBuckets(iter.into_iter().map(|b| b.as_ref().to_vec()).collect())
    }
}

impl IndexBucketClassifier for IndexBuckets {
    fn is_index_bucket(&self, bucket: &[u8]) -> bool {
        self.0.contains(bucket)
    }
}
