use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use lazy_static::lazy_static;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

lazy_static! {
    static ref FILE_LOCKS: DashMap<PathBuf, Arc<Mutex<()>>> = DashMap::new();
}

fn lock_for(path: &Path) -> Arc<Mutex<()>> {
    FILE_LOCKS
        .entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

/// Writes `bytes` to `path` atomically: write to a sibling temp file, fsync
/// it, rename over the destination, then best-effort fsync the parent
/// directory. A per-path lock serializes concurrent writers to the same
/// destination; readers never open the temp file, so they never block on it.
///
/// This is the one write primitive every on-disk artifact in the workspace
/// goes through — chunk-store files, embedding vectors, and document
/// metadata records alike.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> pkm_error::Result<()> {
    let lock = lock_for(path);
    let _guard = lock.lock().await;

    let parent = path.parent().ok_or_else(|| {
        pkm_error::Error::IoTransient(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "destination path has no parent directory",
        ))
    })?;
    tokio::fs::create_dir_all(parent).await?;

    let tmp_path = parent.join(format!(".{}.tmp-{}", file_name(path), uuid::Uuid::new_v4()));

    {
        let mut f = tokio::fs::File::create(&tmp_path).await?;
        f.write_all(bytes).await?;
        f.sync_all().await?;
    }

    tokio::fs::rename(&tmp_path, path).await?;

    let parent_owned = parent.to_path_buf();
    let _ = tokio::task::spawn_blocking(move || {
        if let Ok(dir) = std::fs::File::open(&parent_owned) {
            if let Err(e) = dir.sync_all() {
                tracing::warn!(error = %e, path = %parent_owned.display(), "parent fsync failed");
            }
        }
    })
    .await;

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "record".to_string())
}

/// Reads a whole file. A reader either sees the file before or after an
/// atomic swap, never a partial write, since `write_atomic` never edits a
/// destination in place.
pub async fn read_whole(path: &Path) -> pkm_error::Result<Vec<u8>> {
    Ok(tokio::fs::read(path).await?)
}
