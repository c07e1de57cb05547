//! Platform-specific helpers.
//! Hides OS differences (Unix/Windows) behind a uniform API so the rest of the
//! codebase can remain platform-agnostic.

#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod windows;

#[cfg(unix)]
pub use unix::{fsync_dir, is_cross_device, open_lock_file, open_log_file_secure_append};

#[cfg(not(unix))]
pub use windows::{fsync_dir, is_cross_device, open_lock_file, open_log_file_secure_append};
