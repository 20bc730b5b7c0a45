//! Filesystem-backed object storage engine for HolyDB.
//!
//! The operation set lives in the [`ObjectStore`] trait; [`LocalStorage`]
//! implements it on a local directory tree. Objects are stored as numbered
//! part files plus a JSON metadata file, and every file is written through a
//! temp file and an atomic rename.
//!
//! The engine does not log. Every failure is returned as a [`StorageError`]
//! whose [`class`](StorageError::class) the caller maps onto a status code.
//!
//! # Examples
//!
//! ```
//! use holydb_storage::{LocalStorage, Metadata, ObjectStore};
//! use tokio::io::AsyncReadExt;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = LocalStorage::new(dir.path());
//!
//! tokio_test::block_on(async {
//!     let upload_id = store.start_multipart("videos", "clip.mp4").await?;
//!     store.upload_part("videos", "clip.mp4", &upload_id, 2, &mut &b"BBBB"[..]).await?;
//!     store.upload_part("videos", "clip.mp4", &upload_id, 1, &mut &b"AAAA"[..]).await?;
//!     store
//!         .complete_multipart("videos", "clip.mp4", &upload_id, &Metadata::new())
//!         .await?;
//!
//!     let mut body = Vec::new();
//!     store.get("videos", "clip.mp4").await?.read_to_end(&mut body).await.unwrap();
//!     assert_eq!(body, b"AAAABBBB");
//!     Ok::<_, holydb_storage::StorageError>(())
//! })
//! .unwrap();
//! ```

pub mod artifact;
mod atomic;
mod engine;
pub mod error;
pub mod layout;
mod local;
mod reader;
mod types;

pub use engine::{ByteStream, ObjectReader, ObjectStore};
pub use error::{StorageError, StorageResult};
pub use local::LocalStorage;
pub use types::{BucketMetadata, FILENAME_KEY, Metadata, Stats, default_put_metadata};
