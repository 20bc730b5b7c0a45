//! The storage engine capability.
//!
//! [`ObjectStore`] is the full operation set a backend provides. The request
//! boundary and the authentication layer only ever see this trait, so a
//! backend can be swapped without touching them. [`crate::LocalStorage`] is
//! the filesystem implementation.

use std::path::Path;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::StorageResult;
use crate::types::{BucketMetadata, Metadata, Stats, default_put_metadata};

/// A lazily streamed object body: the parts concatenated in part-number order.
pub type ObjectReader = Box<dyn AsyncRead + Send + Unpin>;

/// Incoming byte stream for a write.
pub type ByteStream<'a> = &'a mut (dyn AsyncRead + Unpin + Send);

/// Object storage operations.
///
/// Buckets are created implicitly by the first write into them. Keys are
/// path-like strings; a key ending in `/` is a directory marker, which never
/// owns parts or metadata.
///
/// Metadata is always the last write of a multi-step mutation (`put`,
/// `complete_multipart`), so its presence marks a committed object.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` as the single part of `bucket/key` with the default
    /// metadata, replacing any previous content.
    async fn put(&self, bucket: &str, key: &str, body: ByteStream<'_>) -> StorageResult<()> {
        let metadata = default_put_metadata();
        self.put_with_metadata(bucket, key, body, Some(&metadata))
            .await
    }

    /// Store `body` as the single part of `bucket/key`, then write `metadata`
    /// (an empty mapping when `None`).
    async fn put_with_metadata(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream<'_>,
        metadata: Option<&Metadata>,
    ) -> StorageResult<()>;

    /// Open the object for reading. Fails with `NoSuchKey` if it has no parts.
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<ObjectReader>;

    /// Replace the object's metadata without touching its parts.
    async fn put_metadata(&self, bucket: &str, key: &str, metadata: &Metadata)
    -> StorageResult<()>;

    /// Read the object's metadata. Fails with `NoSuchMetadata` if absent.
    async fn get_metadata(&self, bucket: &str, key: &str) -> StorageResult<Metadata>;

    /// Remove the object's whole directory subtree. Deleting an absent key
    /// succeeds.
    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()>;

    /// Sorted, deduplicated keys whose path starts with `prefix`.
    ///
    /// The match is a plain string prefix, so `"ab"` also matches `"abc/x"`.
    /// An absent bucket lists as empty.
    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>>;

    /// Open a multipart session and return its upload ID.
    async fn start_multipart(&self, bucket: &str, key: &str) -> StorageResult<String>;

    /// Write, or overwrite, one numbered part of a multipart session.
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: ByteStream<'_>,
    ) -> StorageResult<()>;

    /// Move the staged parts into `bucket/key`, write `metadata` last and drop
    /// the session.
    ///
    /// Concurrent completes onto the same key are not serialized; their part
    /// renames may interleave.
    async fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        metadata: &Metadata,
    ) -> StorageResult<()>;

    /// Discard a multipart session. Succeeds whether or not it still exists.
    async fn abort_multipart(&self, bucket: &str, key: &str, upload_id: &str)
    -> StorageResult<()>;

    /// Replace the bucket-level settings.
    async fn put_bucket_metadata(&self, bucket: &str, metadata: &BucketMetadata)
    -> StorageResult<()>;

    /// Read the bucket-level settings. Fails with `NoSuchBucketMetadata` if
    /// they were never written.
    async fn get_bucket_metadata(&self, bucket: &str) -> StorageResult<BucketMetadata>;

    /// Recompute the bucket's usage.
    async fn stats(&self, bucket: &str) -> StorageResult<Stats>;

    /// Write a self-contained artifact for `bucket/key` to `output`.
    ///
    /// The header carries the metadata entries named in `include_keys`, plus
    /// `filename` whenever the object has one. See [`crate::artifact`] for the
    /// byte layout.
    async fn reconstruct(
        &self,
        bucket: &str,
        key: &str,
        output: &Path,
        include_keys: &[&str],
    ) -> StorageResult<()>;
}
