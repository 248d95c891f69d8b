use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::domain::error::{AppError, Result};

fn persist_err(msg: impl Into<String>) -> AppError {
    AppError::PersistenceError(msg.into())
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| persist_err(format!("Failed to create dir {}: {e}", path.display())))?;
    Ok(())
}

/// Resolve `file` against `data_dir` unless it is already absolute.
pub fn resolve_in_data_dir(data_dir: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        data_dir.join(file)
    }
}

/// Replace `path` with `bytes` so that readers only ever observe the old or the new content.
///
/// The bytes go to a sibling temp file which is fsynced and then renamed over `path`.
/// `fs::rename` replaces an existing destination on every supported platform.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }

    let tmp_path = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
    let written = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(persist_err(format!(
            "Failed to write temp file {}: {e}",
            tmp_path.display()
        )));
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(persist_err(format!(
            "Failed to rename temp file {} to {}: {e}",
            tmp_path.display(),
            path.display()
        )));
    }

    sync_parent_dir(path);
    Ok(())
}

// Makes the rename itself durable. Best-effort: not every platform can open a directory.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}
