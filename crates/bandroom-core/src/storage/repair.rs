//! Best-effort repair of a store file that stays locked
//!
//! Copies the file aside, removes the original, and renames the copy back.
//! This drops any stale lock held on the old inode. It does not make a
//! concurrent writer's changes safe: a process still writing to the old file
//! loses its work. Only used when `repair_on_lock` is enabled.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::error::{StorageError, StorageResult};

/// Path the store is copied to while it is being replaced
pub fn repair_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("store"));
    name.push(".repair");
    path.with_file_name(name)
}

/// Copy the store file aside, remove it, and move the copy back into place
pub fn repair_store_file(path: &Path) -> StorageResult<()> {
    let saved = repair_path(path);
    let fail = |source: io::Error| StorageError::Repair {
        path: path.to_path_buf(),
        source,
    };

    fs::copy(path, &saved).map_err(fail)?;
    fs::remove_file(path).map_err(fail)?;
    fs::rename(&saved, path).map_err(fail)?;
    Ok(())
}
