//! On-disk layout of buckets, objects, parts, and multipart staging.
//!
//! ```text
//! <root>/<bucket>/<key>/part.<N>
//! <root>/<bucket>/<key>/data.meta
//! <root>/<bucket>/.multipart/<upload_id>/part.<N>
//! <root>/<bucket>/.bucket.meta
//! ```
//!
//! Any path component starting with [`RESERVED_PREFIX`] belongs to the engine
//! and is never reported by listing or statistics. The validators here keep
//! caller-supplied names from escaping their bucket or landing in that
//! reserved namespace.

use std::path::{Path, PathBuf};

use crate::error::{StorageError, StorageResult};

/// Leading character of engine-owned entries.
pub const RESERVED_PREFIX: char = '.';

/// Separator inside keys; a key ending in it is a directory marker.
pub const KEY_SEPARATOR: char = '/';

/// Directory holding multipart staging areas, one per upload ID.
pub const MULTIPART_DIR: &str = ".multipart";

/// Bucket-level settings file in the bucket root.
pub const BUCKET_META_FILE: &str = ".bucket.meta";

/// Object metadata file inside an object directory.
pub const OBJECT_META_FILE: &str = "data.meta";

/// File name prefix of numbered parts.
pub const PART_PREFIX: &str = "part.";

/// Prefix of generated upload IDs.
pub const UPLOAD_ID_PREFIX: &str = "upload-";

/// File name of part `n`.
#[must_use]
pub fn part_file_name(part_number: u32) -> String {
    format!("{PART_PREFIX}{part_number}")
}

/// Parse the part number out of a `part.<N>` file name.
///
/// Only canonical positive decimals are accepted, so `part.0`, `part.01`, and
/// temp files never count as parts.
///
/// ```
/// use holydb_storage::layout::parse_part_number;
///
/// assert_eq!(parse_part_number("part.12"), Some(12));
/// assert_eq!(parse_part_number("part.012"), None);
/// assert_eq!(parse_part_number("data.meta"), None);
/// ```
#[must_use]
pub fn parse_part_number(file_name: &str) -> Option<u32> {
    let digits = file_name.strip_prefix(PART_PREFIX)?;
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    digits.parse().ok()
}

/// Whether `key` names a directory marker rather than a leaf object.
#[must_use]
pub fn is_directory_marker(key: &str) -> bool {
    key.ends_with(KEY_SEPARATOR)
}

/// Whether a single path component belongs to the engine.
#[must_use]
pub fn is_reserved(component: &str) -> bool {
    component.starts_with(RESERVED_PREFIX)
}

/// Reject bucket names that could escape the root or hide as reserved entries.
pub fn validate_bucket(bucket: &str) -> StorageResult<()> {
    if bucket.is_empty() {
        return Err(StorageError::invalid("bucket name must not be empty"));
    }
    if bucket.contains(['/', '\\']) {
        return Err(StorageError::invalid(format!(
            "bucket name must not contain a path separator: {bucket}"
        )));
    }
    if is_reserved(bucket) {
        return Err(StorageError::invalid(format!(
            "bucket name must not start with '{RESERVED_PREFIX}': {bucket}"
        )));
    }
    Ok(())
}

/// Reject keys that are empty, absolute, traverse upwards, or collide with
/// the reserved entries at the bucket root.
///
/// A single trailing separator is allowed; it marks a directory marker.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::invalid("object key must not be empty"));
    }
    if key.starts_with(KEY_SEPARATOR) {
        return Err(StorageError::invalid(format!(
            "object key must not start with '{KEY_SEPARATOR}': {key}"
        )));
    }

    let body = key.strip_suffix(KEY_SEPARATOR).unwrap_or(key);
    for (index, segment) in body.split(KEY_SEPARATOR).enumerate() {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(StorageError::invalid(format!(
                "object key has an invalid segment: {key}"
            )));
        }
        if index == 0 && is_reserved(segment) {
            return Err(StorageError::invalid(format!(
                "object key must not start with '{RESERVED_PREFIX}': {key}"
            )));
        }
    }
    Ok(())
}

/// Reject upload IDs that are not a single plain path component.
pub fn validate_upload_id(upload_id: &str) -> StorageResult<()> {
    if upload_id.is_empty()
        || upload_id == "."
        || upload_id == ".."
        || upload_id.contains(['/', '\\'])
    {
        return Err(StorageError::invalid(format!(
            "invalid upload id: {upload_id:?}"
        )));
    }
    Ok(())
}

/// Part numbers are positive.
pub fn validate_part_number(part_number: u32) -> StorageResult<()> {
    if part_number == 0 {
        return Err(StorageError::invalid("part number must be positive"));
    }
    Ok(())
}

/// Path arithmetic for one storage root.
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    root: PathBuf,
}

impl Layout {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    pub(crate) fn object_dir(&self, bucket: &str, key: &str) -> PathBuf {
        self.bucket_dir(bucket).join(key)
    }

    pub(crate) fn object_meta_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.object_dir(bucket, key).join(OBJECT_META_FILE)
    }

    pub(crate) fn staging_root(&self, bucket: &str) -> PathBuf {
        self.bucket_dir(bucket).join(MULTIPART_DIR)
    }

    pub(crate) fn staging_dir(&self, bucket: &str, upload_id: &str) -> PathBuf {
        self.staging_root(bucket).join(upload_id)
    }

    pub(crate) fn bucket_meta_path(&self, bucket: &str) -> PathBuf {
        self.bucket_dir(bucket).join(BUCKET_META_FILE)
    }
}
