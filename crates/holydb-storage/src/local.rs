//! Filesystem-backed [`ObjectStore`].
//!
//! Every bucket is a directory under the storage root and every object is a
//! directory under its bucket holding `part.<N>` files and a `data.meta` JSON
//! file. See [`crate::layout`] for the full layout.
//!
//! There is no in-process locking. Concurrent writers to the same key
//! interleave at the granularity of single renames; in particular two
//! `complete_multipart` calls on the same destination may mix their parts.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use holydb_core::HolyDbConfig;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncReadExt;
use uuid::Uuid;

use crate::artifact::{encode_header, select_header};
use crate::atomic::{copy_atomic, write_atomic};
use crate::engine::{ByteStream, ObjectReader, ObjectStore};
use crate::error::{StorageError, StorageResult};
use crate::layout::{
    Layout, RESERVED_PREFIX, UPLOAD_ID_PREFIX, is_directory_marker, is_reserved, parse_part_number,
    part_file_name, validate_bucket, validate_key, validate_part_number, validate_upload_id,
};
use crate::reader::PartReader;
use crate::types::{BucketMetadata, Metadata, Stats};

/// Object store rooted at a local directory.
///
/// # Examples
///
/// ```
/// use holydb_storage::{LocalStorage, ObjectStore};
/// use tokio::io::AsyncReadExt;
///
/// let dir = tempfile::tempdir().unwrap();
/// let store = LocalStorage::new(dir.path());
///
/// tokio_test::block_on(async {
///     store.put("photos", "cat.txt", &mut &b"meow"[..]).await.unwrap();
///
///     let mut body = String::new();
///     let mut reader = store.get("photos", "cat.txt").await.unwrap();
///     reader.read_to_string(&mut body).await.unwrap();
///     assert_eq!(body, "meow");
/// });
/// ```
#[derive(Debug, Clone)]
pub struct LocalStorage {
    layout: Layout,
}

impl LocalStorage {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: Layout::new(root),
        }
    }

    /// Create a store rooted at the configured data directory.
    #[must_use]
    pub fn from_config(config: &HolyDbConfig) -> Self {
        Self::new(config.data_dir.clone())
    }

    /// The storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.layout.root()
    }
}

#[async_trait]
impl ObjectStore for LocalStorage {
    async fn put_with_metadata(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream<'_>,
        metadata: Option<&Metadata>,
    ) -> StorageResult<()> {
        validate_bucket(bucket)?;
        validate_key(key)?;

        let dir = self.layout.object_dir(bucket, key);
        create_dir_all(&dir).await?;
        if is_directory_marker(key) {
            return Ok(());
        }

        // The body lands in a reserved file first, so a failed stream leaves
        // the current version of the object untouched.
        let staged = dir.join(format!("{RESERVED_PREFIX}put-{}", Uuid::new_v4().simple()));
        copy_atomic(body, &staged).await?;

        let meta_path = self.layout.object_meta_path(bucket, key);
        let metadata = metadata.cloned().unwrap_or_default();
        if let Err(err) = commit_put(&dir, &staged, &meta_path, &metadata).await {
            remove_file(&staged).await?;
            return Err(err);
        }
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<ObjectReader> {
        validate_bucket(bucket)?;
        validate_key(key)?;

        let parts = if is_directory_marker(key) {
            Vec::new()
        } else {
            part_files(&self.layout.object_dir(bucket, key)).await?
        };
        if parts.is_empty() {
            return Err(StorageError::NoSuchKey {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
            });
        }

        let reader = PartReader::new(parts.into_iter().map(|(_, path)| path));
        Ok(Box::new(reader))
    }

    async fn put_metadata(
        &self,
        bucket: &str,
        key: &str,
        metadata: &Metadata,
    ) -> StorageResult<()> {
        validate_bucket(bucket)?;
        validate_key(key)?;
        if is_directory_marker(key) {
            return Err(StorageError::invalid(format!(
                "directory marker {key} cannot carry metadata"
            )));
        }

        create_dir_all(&self.layout.object_dir(bucket, key)).await?;
        write_json(&self.layout.object_meta_path(bucket, key), metadata).await
    }

    async fn get_metadata(&self, bucket: &str, key: &str) -> StorageResult<Metadata> {
        validate_bucket(bucket)?;
        validate_key(key)?;

        let metadata = if is_directory_marker(key) {
            None
        } else {
            read_json(&self.layout.object_meta_path(bucket, key)).await?
        };
        metadata.ok_or_else(|| StorageError::NoSuchMetadata {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
        })
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        validate_bucket(bucket)?;
        validate_key(key)?;
        remove_dir_all(&self.layout.object_dir(bucket, key)).await
    }

    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        validate_bucket(bucket)?;

        let keys: BTreeSet<String> = walk_files(&self.layout.bucket_dir(bucket))
            .await?
            .into_iter()
            .map(|file| file.object_key())
            .filter(|key| key.starts_with(prefix))
            .collect();
        Ok(keys.into_iter().collect())
    }

    async fn start_multipart(&self, bucket: &str, key: &str) -> StorageResult<String> {
        validate_bucket(bucket)?;
        validate_key(key)?;

        create_dir_all(&self.layout.staging_root(bucket)).await?;
        let upload_id = format!("{UPLOAD_ID_PREFIX}{}", Uuid::new_v4().simple());
        let staging = self.layout.staging_dir(bucket, &upload_id);
        tokio::fs::create_dir(&staging)
            .await
            .with_context(|| format!("failed to create upload dir {}", staging.display()))?;
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: ByteStream<'_>,
    ) -> StorageResult<()> {
        validate_bucket(bucket)?;
        validate_key(key)?;
        validate_upload_id(upload_id)?;
        validate_part_number(part_number)?;

        let staging = self.layout.staging_dir(bucket, upload_id);
        create_dir_all(&staging).await?;
        copy_atomic(body, &staging.join(part_file_name(part_number))).await?;
        Ok(())
    }

    async fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        metadata: &Metadata,
    ) -> StorageResult<()> {
        validate_bucket(bucket)?;
        validate_key(key)?;
        validate_upload_id(upload_id)?;
        if is_directory_marker(key) {
            return Err(StorageError::invalid(format!(
                "cannot complete an upload onto directory marker {key}"
            )));
        }

        let staging = self.layout.staging_dir(bucket, upload_id);
        let staged = tokio::fs::try_exists(&staging)
            .await
            .with_context(|| format!("failed to stat {}", staging.display()))?;
        if !staged {
            return Err(StorageError::NoSuchUpload {
                bucket: bucket.to_owned(),
                upload_id: upload_id.to_owned(),
            });
        }
        let parts = part_files(&staging).await?;
        if parts.is_empty() {
            return Err(StorageError::invalid(format!(
                "upload {upload_id} has no parts"
            )));
        }

        let dest = self.layout.object_dir(bucket, key);
        let meta_path = self.layout.object_meta_path(bucket, key);
        create_dir_all(&dest).await?;
        remove_file(&meta_path).await?;
        remove_parts_after(&dest, 0).await?;
        for (number, path) in parts {
            rename(&path, &dest.join(part_file_name(number))).await?;
        }

        write_json(&meta_path, metadata).await?;
        remove_dir_all(&staging).await
    }

    async fn abort_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> StorageResult<()> {
        validate_bucket(bucket)?;
        validate_key(key)?;
        validate_upload_id(upload_id)?;
        remove_dir_all(&self.layout.staging_dir(bucket, upload_id)).await
    }

    async fn put_bucket_metadata(
        &self,
        bucket: &str,
        metadata: &BucketMetadata,
    ) -> StorageResult<()> {
        validate_bucket(bucket)?;
        create_dir_all(&self.layout.bucket_dir(bucket)).await?;
        write_json(&self.layout.bucket_meta_path(bucket), metadata).await
    }

    async fn get_bucket_metadata(&self, bucket: &str) -> StorageResult<BucketMetadata> {
        validate_bucket(bucket)?;
        read_json(&self.layout.bucket_meta_path(bucket))
            .await?
            .ok_or_else(|| StorageError::NoSuchBucketMetadata {
                bucket: bucket.to_owned(),
            })
    }

    async fn stats(&self, bucket: &str) -> StorageResult<Stats> {
        validate_bucket(bucket)?;

        let files = walk_files(&self.layout.bucket_dir(bucket)).await?;
        let used_bytes = files
            .iter()
            .filter(|file| file.is_part())
            .map(|file| file.len)
            .sum();
        let object_count = self.list(bucket, "").await?.len() as u64;
        let capacity_bytes = match self.get_bucket_metadata(bucket).await {
            Ok(meta) => meta.capacity_bytes,
            Err(StorageError::NoSuchBucketMetadata { .. }) => 0,
            Err(e) => return Err(e),
        };

        Ok(Stats {
            object_count,
            used_bytes,
            capacity_bytes,
        })
    }

    async fn reconstruct(
        &self,
        bucket: &str,
        key: &str,
        output: &Path,
        include_keys: &[&str],
    ) -> StorageResult<()> {
        if output.as_os_str().is_empty() {
            return Err(StorageError::invalid("reconstruct needs an output path"));
        }

        let metadata = self.get_metadata(bucket, key).await?;
        let parts = part_files(&self.layout.object_dir(bucket, key)).await?;
        if parts.is_empty() {
            return Err(StorageError::NoSuchKey {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
            });
        }

        let header = encode_header(&select_header(&metadata, include_keys))?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent).await?;
        }

        let mut artifact =
            (&header[..]).chain(PartReader::new(parts.into_iter().map(|(_, path)| path)));
        copy_atomic(&mut artifact, output).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Filesystem helpers
// ---------------------------------------------------------------------------

async fn create_dir_all(dir: &Path) -> StorageResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;
    Ok(())
}

/// Remove a directory tree; an absent one is fine.
async fn remove_dir_all(dir: &Path) -> StorageResult<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(anyhow::Error::new(e)
            .context(format!("failed to remove {}", dir.display()))
            .into()),
    }
}

/// The `part.<N>` files directly in `dir`, sorted by part number.
async fn part_files(dir: &Path) -> StorageResult<Vec<(u32, PathBuf)>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("failed to read {}", dir.display()))
                .into());
        }
    };

    let mut parts = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("failed to read {}", dir.display()))?
    {
        let Some(number) = entry.file_name().to_str().and_then(parse_part_number) else {
            continue;
        };
        let file_type = entry
            .file_type()
            .await
            .with_context(|| format!("failed to stat {}", entry.path().display()))?;
        if file_type.is_file() {
            parts.push((number, entry.path()));
        }
    }
    parts.sort_unstable_by_key(|(number, _)| *number);
    Ok(parts)
}

/// Delete every part file in `dir` so a new object cannot inherit old parts.
/// Replace an object's content with the staged `part.1`.
///
/// The old metadata goes first and the new metadata last, so the object reads
/// as uncommitted while its parts are being swapped.
async fn commit_put(
    dir: &Path,
    staged: &Path,
    meta_path: &Path,
    metadata: &Metadata,
) -> StorageResult<()> {
    remove_file(meta_path).await?;
    rename(staged, &dir.join(part_file_name(1))).await?;
    remove_parts_after(dir, 1).await?;
    write_json(meta_path, metadata).await
}

/// Remove the `part.<N>` files in `dir` with `N > last`.
async fn remove_parts_after(dir: &Path, last: u32) -> StorageResult<()> {
    for (_, path) in part_files(dir).await?.into_iter().filter(|(n, _)| *n > last) {
        remove_file(&path).await?;
    }
    Ok(())
}

async fn remove_file(path: &Path) -> StorageResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(anyhow::Error::new(e)
            .context(format!("failed to remove {}", path.display()))
            .into()),
    }
}

async fn rename(from: &Path, to: &Path) -> StorageResult<()> {
    tokio::fs::rename(from, to)
        .await
        .with_context(|| format!("failed to move {} to {}", from.display(), to.display()))?;
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("failed to read {}", path.display()))
                .into());
        }
    };
    let value = serde_json::from_slice(&bytes)
        .with_context(|| format!("malformed JSON in {}", path.display()))?;
    Ok(Some(value))
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StorageResult<()> {
    let bytes = serde_json::to_vec(value)
        .with_context(|| format!("failed to encode {}", path.display()))?;
    write_atomic(path, bytes).await
}

/// A regular file found while walking a bucket.
#[derive(Debug)]
struct BucketFile {
    /// Directory components from the bucket root down to the file.
    dirs: Vec<String>,
    name: String,
    len: u64,
}

impl BucketFile {
    /// The key of the object owning this file: its parent directory, or the
    /// file name itself for files at the bucket root.
    fn object_key(&self) -> String {
        if self.dirs.is_empty() {
            self.name.clone()
        } else {
            self.dirs.join("/")
        }
    }

    fn is_part(&self) -> bool {
        parse_part_number(&self.name).is_some()
    }
}

/// All regular files under `bucket_dir`, skipping reserved entries at the
/// bucket root and reserved file names anywhere. An absent bucket is empty.
async fn walk_files(bucket_dir: &Path) -> StorageResult<Vec<BucketFile>> {
    let mut files = Vec::new();
    let mut pending: Vec<Vec<String>> = vec![Vec::new()];

    while let Some(dirs) = pending.pop() {
        let dir = dirs.iter().fold(bucket_dir.to_path_buf(), |path, d| path.join(d));
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("failed to read {}", dir.display()))
                    .into());
            }
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("failed to read {}", dir.display()))?
        {
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let file_type = entry
                .file_type()
                .await
                .with_context(|| format!("failed to stat {}", entry.path().display()))?;

            if file_type.is_dir() {
                if dirs.is_empty() && is_reserved(&name) {
                    continue;
                }
                let mut child = dirs.clone();
                child.push(name);
                pending.push(child);
            } else if file_type.is_file() && !is_reserved(&name) {
                let len = entry
                    .metadata()
                    .await
                    .with_context(|| format!("failed to stat {}", entry.path().display()))?
                    .len();
                files.push(BucketFile {
                    dirs: dirs.clone(),
                    name,
                    len,
                });
            }
        }
    }
    Ok(files)
}
