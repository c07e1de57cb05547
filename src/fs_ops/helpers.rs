//! I/O helper utilities.
//!
//! Small adapters that enrich io::Error with the operation, the path, and an
//! actionable hint, usable with map_err in anyhow::Result code paths.
//!
//! Usage:
//!   fs::create_dir_all(dir).map_err(io_error_with_help("create dir", dir))?;

use anyhow::anyhow;
use std::io;
use std::path::Path;

/// Format a human-friendly message with op/path plus platform-aware hints.
fn build_message(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);

    if let Some(code) = e.raw_os_error() {
        #[cfg(unix)]
        {
            let hint = match code {
                libc::EACCES | libc::EPERM => Some("permission denied; check ownership and write permissions"),
                libc::EXDEV => Some("cross-filesystem; atomic rename not possible"),
                libc::EBUSY => Some("resource busy; another process may hold the file"),
                libc::ENOENT => Some("path not found; it may have been removed concurrently"),
                libc::EEXIST => Some("already exists"),
                libc::ENOSPC => Some("insufficient space on device"),
                libc::EROFS => Some("read-only filesystem"),
                libc::ESTALE => Some("stale network file handle; check the mount"),
                libc::ENAMETOOLONG => Some("filename or path too long"),
                libc::EMFILE | libc::ENFILE => Some("too many open files"),
                _ => None,
            };
            if let Some(hint) = hint {
                msg.push_str("; ");
                msg.push_str(hint);
            }
        }
        #[cfg(windows)]
        {
            let hint = match code {
                5 => Some("access denied; check permissions"),
                17 => Some("not same device; cross-filesystem move"),
                32 => Some("sharing violation; file is in use"),
                2 | 3 => Some("path not found; it may have been removed concurrently"),
                80 | 183 => Some("already exists"),
                112 => Some("insufficient disk space"),
                _ => None,
            };
            if let Some(hint) = hint {
                msg.push_str("; ");
                msg.push_str(hint);
            }
        }
        msg.push_str(&format!(" [os code: {}]", code));
    } else {
        let hint = match e.kind() {
            io::ErrorKind::PermissionDenied => Some("permission denied; check ownership and write permissions"),
            io::ErrorKind::NotFound => Some("path not found; it may have been removed concurrently"),
            io::ErrorKind::AlreadyExists => Some("already exists"),
            _ => None,
        };
        if let Some(hint) = hint {
            msg.push_str("; ");
            msg.push_str(hint);
        }
    }

    msg
}

/// Returns a closure suitable for `.map_err(...)` that converts io::Error -> anyhow::Error.
pub fn io_error_with_help<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> anyhow::Error + 'a {
    move |e: io::Error| anyhow!(build_message(op, path, &e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_operation_and_path() {
        let err = io_error_with_help("copy to destination", Path::new("/x/y.occ"))(io::Error::from(
            io::ErrorKind::PermissionDenied,
        ));
        let msg = err.to_string();
        assert!(msg.starts_with("copy to destination '/x/y.occ'"));
        assert!(msg.contains("permission denied"));
    }

    #[cfg(unix)]
    #[test]
    fn raw_codes_get_hints() {
        let err = io_error_with_help("write", Path::new("/full"))(io::Error::from_raw_os_error(libc::ENOSPC));
        let msg = err.to_string();
        assert!(msg.contains("insufficient space"));
        assert!(msg.contains("[os code:"));
    }
}
