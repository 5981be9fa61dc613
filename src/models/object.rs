//! Represents objects as reported by a bucket listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tier::StorageTier;

/// A single entry of a bucket listing. Only the key is guaranteed; the rest
/// is whatever the store reports.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ObjectDescriptor {
    /// Object key (path-like identifier within the bucket).
    pub key: String,

    /// Size in bytes.
    pub size: Option<u64>,

    /// Timestamp when the object was last written.
    pub last_modified: Option<DateTime<Utc>>,

    /// Entity tag as reported by the store.
    pub etag: Option<String>,

    /// Store-specific storage class (e.g. STANDARD, GLACIER).
    pub storage_class: Option<String>,
}

/// An object present in a bucket with no metadata record pointing at it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrphanObject {
    #[serde(flatten)]
    pub object: ObjectDescriptor,

    /// Tier whose bucket holds the object.
    pub tier: StorageTier,

    /// Bucket name for that tier.
    pub bucket: String,
}

impl OrphanObject {
    pub fn key(&self) -> &str {
        &self.object.key
    }
}

/// Listing of one tier's bucket.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BucketObjects {
    pub tier: StorageTier,
    pub bucket: String,
    pub objects: Vec<ObjectDescriptor>,
    pub count: usize,
}

/// Listing of both tiers, stamped with the collection time.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AllBucketObjects {
    pub hot: BucketObjects,
    pub cold: BucketObjects,
    pub total_count: usize,
    pub collected_at: DateTime<Utc>,
}
