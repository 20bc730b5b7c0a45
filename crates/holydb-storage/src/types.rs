//! Value types persisted or derived by the storage engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Arbitrary key/value metadata stored alongside an object in `data.meta`.
///
/// A `BTreeMap` keeps the serialized JSON deterministic.
pub type Metadata = BTreeMap<String, String>;

/// Metadata key that [`crate::ObjectStore::reconstruct`] always carries into the
/// artifact header when the object has it.
pub const FILENAME_KEY: &str = "filename";

/// Metadata written by a plain `put` that supplies none.
#[must_use]
pub fn default_put_metadata() -> Metadata {
    Metadata::from([("created_by".to_owned(), "LocalStorage".to_owned())])
}

/// Per-bucket settings, stored as `.bucket.meta` in the bucket root.
///
/// ```
/// use holydb_storage::BucketMetadata;
///
/// let meta = BucketMetadata { capacity_bytes: 1 << 30, retention_days: 7 };
/// let json = serde_json::to_string(&meta).unwrap();
/// assert_eq!(json, r#"{"capacity_bytes":1073741824,"retention_days":7}"#);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketMetadata {
    /// Capacity in bytes; `0` means unlimited.
    #[serde(default)]
    pub capacity_bytes: i64,
    /// Retention in days; `0` means unlimited. Stored but not enforced.
    #[serde(default)]
    pub retention_days: i32,
}

/// Usage snapshot for one bucket, recomputed on every request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Number of distinct objects, as reported by `list(bucket, "")`.
    pub object_count: u64,
    /// Sum of the sizes of all part files outside reserved entries.
    pub used_bytes: u64,
    /// Copied from the bucket metadata, `0` when none was written.
    pub capacity_bytes: i64,
}
