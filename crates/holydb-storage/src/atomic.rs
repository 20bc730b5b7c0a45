//! Temp-file-then-rename writes.
//!
//! Every file the engine writes lands first in a uniquely named `.tmp*` file in
//! the destination directory and is then renamed over the target, so readers
//! only ever see the old or the new content. Temp file creation and the final
//! rename are blocking calls and run on the blocking pool.

use std::path::Path;

use anyhow::Context;
use tempfile::{Builder, NamedTempFile};
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::error::StorageResult;

/// Prefix of in-flight temp files. Reserved, so listing never reports them.
const TEMP_PREFIX: &str = ".tmp";

/// Atomically replace `path` with `bytes`.
pub(crate) async fn write_atomic(path: &Path, bytes: Vec<u8>) -> StorageResult<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic_blocking(&path, &bytes))
        .await
        .context("atomic write task failed")?
}

/// Stream `reader` into a temp file next to `path`, then rename it into place.
///
/// Returns the number of bytes written. On failure the temp file is removed and
/// `path` is left untouched.
pub(crate) async fn copy_atomic(
    reader: &mut (dyn AsyncRead + Unpin + Send),
    path: &Path,
) -> StorageResult<u64> {
    let dir = parent_dir(path).to_path_buf();
    let temp = tokio::task::spawn_blocking(move || create_temp_in(&dir))
        .await
        .context("temp file task failed")??;

    let (file, temp_path) = temp.into_parts();
    let mut file = tokio::fs::File::from_std(file);
    let written = tokio::io::copy(reader, &mut file)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    file.flush()
        .await
        .with_context(|| format!("failed to flush {}", path.display()))?;
    drop(file);

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        temp_path
            .persist(&target)
            .with_context(|| format!("failed to rename temp file onto {}", target.display()))
    })
    .await
    .context("rename task failed")??;

    Ok(written)
}

fn write_atomic_blocking(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    use std::io::Write;

    let mut temp = create_temp_in(parent_dir(path))?;
    temp.write_all(bytes)
        .with_context(|| format!("failed to write temp file for {}", path.display()))?;
    temp.persist(path)
        .with_context(|| format!("failed to rename temp file onto {}", path.display()))?;
    Ok(())
}

fn create_temp_in(dir: &Path) -> StorageResult<NamedTempFile> {
    let temp = Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    Ok(temp)
}

/// Directory a temp file for `path` must live in for the rename to stay on one
/// filesystem.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Temp files left behind in `dir`.
#[cfg(test)]
pub(crate) fn temp_files_in(dir: &Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| {
                    e.file_name()
                        .to_str()
                        .is_some_and(|name| name.starts_with(TEMP_PREFIX))
                })
                .map(|e| e.path())
                .collect()
        })
        .unwrap_or_default()
}
