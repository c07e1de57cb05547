//! Single-instance lock.
//! Holds an exclusive, non-blocking advisory lock on a well-known file for the
//! whole process lifetime, so two bridges never work the same folders at once.
//!
//! Design:
//! - `fs2` gives flock(LOCK_EX|LOCK_NB) on Unix and LockFileEx on Windows.
//! - The file records `pid=` and `started=` for operators; the content is
//!   informational, only the advisory lock matters.
//! - The lock is released when the guard is dropped. If the process dies the OS
//!   releases it, so a crashed instance never blocks the next one.
//!
//! Notes:
//! - The file itself is left in place on release. Unlinking a flock'ed file lets a
//!   racing process lock an orphaned inode while a third creates a fresh one.

use chrono::Local;
use fs2::FileExt;
use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::errors::LockError;
use crate::platform::open_lock_file;

/// RAII guard held while this process owns the instance lock.
pub struct InstanceLock {
    file: Option<File>,
    path: PathBuf,
}

impl std::fmt::Debug for InstanceLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceLock")
            .field("path", &self.path)
            .field("held", &self.file.is_some())
            .finish()
    }
}

impl InstanceLock {
    /// Try to take the lock without blocking.
    /// Returns `LockError::AlreadyRunning` when another holder exists.
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        let io_err = |source: io::Error| LockError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut file = open_lock_file(path).map_err(io_err)?;

        // Fully qualified: std::fs::File has an inherent try_lock_exclusive on newer toolchains.
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {}
            Err(e) if is_contended(&e) => {
                trace!(path = %path.display(), "try-lock would block");
                return Err(LockError::AlreadyRunning(path.to_path_buf()));
            }
            Err(e) => return Err(io_err(e)),
        }

        write_record(&mut file).map_err(io_err)?;
        debug!(path = %path.display(), pid = std::process::id(), "Instance lock acquired");
        Ok(Self {
            file: Some(file),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release explicitly. Dropping the guard does the same.
    pub fn release(mut self) {
        self.unlock();
    }

    fn unlock(&mut self) {
        if let Some(file) = self.file.take() {
            // Best-effort: closing the handle releases the lock anyway.
            let _ = FileExt::unlock(&file);
            trace!(path = %self.path.display(), "Instance lock released");
        }
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        self.unlock();
    }
}

fn is_contended(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    // fs2 reports the raw errno / Win32 code; make sure both spellings match.
    e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn write_record(file: &mut File) -> io::Result<()> {
    let record = format!(
        "pid={}\nstarted={}\n",
        std::process::id(),
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(record.as_bytes())?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acquire_creates_parent_and_writes_record() {
        let td = tempdir().unwrap();
        let path = td.path().join("runtime").join("bridge.lock");
        let lock = InstanceLock::acquire(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(&format!("pid={}\n", std::process::id())));
        assert!(content.contains("started="));
        assert_eq!(lock.path(), path.as_path());
    }

    #[test]
    fn second_acquire_is_already_running() {
        let td = tempdir().unwrap();
        let path = td.path().join("bridge.lock");
        let first = InstanceLock::acquire(&path).unwrap();
        match InstanceLock::acquire(&path) {
            Err(LockError::AlreadyRunning(p)) => assert_eq!(p, path),
            other => panic!("expected AlreadyRunning, got {other:?}"),
        }
        first.release();
        let again = InstanceLock::acquire(&path);
        assert!(again.is_ok());
    }

    #[test]
    fn drop_releases() {
        let td = tempdir().unwrap();
        let path = td.path().join("bridge.lock");
        {
            let _held = InstanceLock::acquire(&path).unwrap();
        }
        InstanceLock::acquire(&path).unwrap();
        assert!(path.exists(), "lock file stays on disk after release");
    }
}
