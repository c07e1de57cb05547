//! Candidate discovery for one source directory.
//! - Lists regular files directly inside the directory (no recursion).
//! - Keeps files whose extension matches the filter (case-insensitive) and whose
//!   modification time is at least `min_age` old.
//! - Orders by modification time, then case-insensitive name, so files are relayed
//!   in arrival order.
//!
//! Notes:
//! - A missing directory yields an empty list; directories are created at startup.
//!   Any other stat failure (not a directory, permission, stale mount) is an error.
//! - A file whose mtime cannot be read is treated as infinitely new: excluded when an
//!   age filter is active, sorted last otherwise. One bad entry never fails the scan.

use anyhow::Result;
use std::cmp::Ordering;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;
use walkdir::WalkDir;

use super::helpers::io_error_with_help;

/// A file that passed the filters at listing time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    /// None when the mtime could not be read
    pub modified: Option<SystemTime>,
}

impl Candidate {
    fn sort_key(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }
}

/// True when `name` carries the extension `ext` (already lower-cased, no dot).
/// An empty filter matches everything; a name without a usable extension
/// never matches a non-empty filter.
pub fn matches_extension(name: &str, ext: &str) -> bool {
    if ext.is_empty() {
        return true;
    }
    match name.rfind('.') {
        Some(pos) if pos + 1 < name.len() => name[pos + 1..].to_lowercase() == ext,
        _ => false,
    }
}

/// Age filter against `now`. Future mtimes count as zero age.
fn old_enough(modified: Option<SystemTime>, now: SystemTime, min_age: Duration) -> bool {
    if min_age.is_zero() {
        return true;
    }
    match modified {
        Some(t) => now.duration_since(t).map(|age| age >= min_age).unwrap_or(false),
        None => false,
    }
}

fn compare(a: &Candidate, b: &Candidate) -> Ordering {
    // None sorts after every real timestamp.
    let by_time = match (a.modified, b.modified) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_time.then_with(|| a.sort_key().cmp(&b.sort_key()))
}

/// List eligible files in `dir`, oldest first.
pub fn list_candidates(
    dir: &Path,
    ext: &str,
    min_age: Duration,
    now: SystemTime,
) -> Result<Vec<Candidate>> {
    match std::fs::symlink_metadata(dir) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error_with_help("list source directory", dir)(e)),
        Ok(_) => {}
    }
    // Surface an unreadable directory as a flow-level error rather than an empty batch.
    std::fs::read_dir(dir).map_err(io_error_with_help("list source directory", dir))?;

    let mut out = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !matches_extension(&name, ext) {
            continue;
        }
        let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
        if !old_enough(modified, now, min_age) {
            debug!(path = %entry.path().display(), "Too new, leaving for the next cycle");
            continue;
        }
        out.push(Candidate {
            path: entry.into_path(),
            modified,
        });
    }

    out.sort_by(compare);
    Ok(out)
}
