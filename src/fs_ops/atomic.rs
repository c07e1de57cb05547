//! Staged copy and rename helpers.
//! - Copies go to a hidden temp file in the destination directory, are fsynced,
//!   then renamed into place, so readers never see a half-written file.
//! - The no-clobber rename refuses to replace a file that appeared meanwhile.
//! - Relocation prefers a plain rename and falls back to staged copy + remove
//!   when source and destination live on different filesystems.

use anyhow::{Context, Result, bail};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tempfile::{Builder, NamedTempFile};

use super::helpers::io_error_with_help;
use super::transfer::OnExisting;
use crate::platform::{fsync_dir, is_cross_device};

/// Prefix of staged temp files; `reconcile` removes leftovers with this shape.
pub const TEMP_PREFIX: &str = ".zfin_bridge.";
pub const TEMP_SUFFIX: &str = ".part";

/// Copy `src` into a new temp file inside `dir` and flush it to disk.
pub fn stage_copy(src: &Path, dir: &Path) -> Result<NamedTempFile> {
    let mut input = File::open(src).map_err(io_error_with_help("open source file", src))?;
    let mut tmp = Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)
        .map_err(io_error_with_help("create temporary file in", dir))?;
    let tmp_path = tmp.path().to_path_buf();
    io::copy(&mut input, tmp.as_file_mut())
        .map_err(io_error_with_help("copy into temporary file", &tmp_path))?;
    tmp.as_file()
        .sync_all()
        .map_err(io_error_with_help("fsync temporary file", &tmp_path))?;
    Ok(tmp)
}

/// Rename a staged file to `dest`.
/// Returns Ok(false) when `on_existing` is Skip and `dest` already exists; the
/// staged file is then discarded.
pub fn place(staged: NamedTempFile, dest: &Path, on_existing: OnExisting) -> Result<bool> {
    let persisted = match on_existing {
        OnExisting::Overwrite => staged.persist(dest),
        OnExisting::Skip => staged.persist_noclobber(dest),
    };
    match persisted {
        Ok(_) => {}
        Err(e) if on_existing == OnExisting::Skip && e.error.kind() == io::ErrorKind::AlreadyExists => {
            return Ok(false);
        }
        // Dropping the PersistError drops the temp file with it.
        Err(e) => return Err(io_error_with_help("rename into", dest)(e.error)),
    }
    if let Some(parent) = dest.parent() {
        // Ignore fsync errors to avoid turning a successful rename into a failure.
        let _ = fsync_dir(parent);
    }
    Ok(true)
}

/// Move `src` to `dst`, falling back to copy + remove across filesystems.
pub fn relocate(src: &Path, dst: &Path, on_existing: OnExisting) -> Result<()> {
    if on_existing == OnExisting::Skip && fs::symlink_metadata(dst).is_ok() {
        bail!("move to archive '{}': already exists", dst.display());
    }

    // Windows: rename does not replace an existing file.
    #[cfg(windows)]
    if on_existing == OnExisting::Overwrite && dst.exists() {
        fs::remove_file(dst).map_err(io_error_with_help("remove existing archive entry", dst))?;
    }

    match fs::rename(src, dst) {
        Ok(()) => {
            if let Some(parent) = dst.parent() {
                let _ = fsync_dir(parent);
            }
            Ok(())
        }
        Err(e) if is_cross_device(&e) => {
            let parent = dst
                .parent()
                .with_context(|| format!("archive path has no parent: {}", dst.display()))?;
            let staged = stage_copy(src, parent)?;
            if !place(staged, dst, on_existing)? {
                bail!("move to archive '{}': already exists", dst.display());
            }
            fs::remove_file(src).map_err(io_error_with_help("remove original after copy", src))?;
            Ok(())
        }
        Err(e) => Err(io_error_with_help("move to archive", dst)(e)),
    }
}
