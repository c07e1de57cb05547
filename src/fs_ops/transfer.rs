//! Single-file transfer: deliver a copy to the flow's destination, then archive the original.
//!
//! Ordering invariant: the copy is in place before the source leaves the source
//! directory. A crash in between leaves the source to be found again next cycle:
//! - Overwrite: the re-copy replaces the destination with identical bytes, then archives.
//! - Skip: the existing destination makes every later attempt a skip until an
//!   operator removes either file. This is intentional and must stay that way.
//!
//! Failures never escape as errors; they come back as `TransferOutcome::Failed`
//! so the batch can carry on with the next candidate.

use anyhow::{Context, Result};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

use super::atomic::{place, relocate, stage_copy};
use super::helpers::io_error_with_help;
use crate::flow::Flow;

/// What to do when the destination (or archive entry) already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnExisting {
    /// Replace the existing file.
    Overwrite,
    /// Leave everything untouched and report a skip.
    Skip,
}

impl OnExisting {
    pub fn from_overwrite_flag(overwrite: bool) -> Self {
        if overwrite {
            OnExisting::Overwrite
        } else {
            OnExisting::Skip
        }
    }
}

/// Result of one transfer attempt.
#[derive(Debug)]
pub enum TransferOutcome {
    Delivered {
        destination: PathBuf,
        archived: PathBuf,
    },
    SkippedExisting {
        destination: PathBuf,
    },
    Failed {
        source: PathBuf,
        error: anyhow::Error,
    },
}

/// Destination file name for `source_name` under target extension `target_ext`.
///
/// The extension is everything after the last dot; a dot at position 0 does not
/// start an extension. An empty target extension keeps the name verbatim.
pub fn destination_file_name(source_name: &OsStr, target_ext: &str) -> OsString {
    if target_ext.trim().is_empty() {
        return source_name.to_os_string();
    }
    let name = source_name.to_string_lossy();
    let base = match name.rfind('.') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => &name[..],
    };
    OsString::from(format!("{base}.{target_ext}"))
}

/// Transfer `source` for `flow`, archiving the original under `archive_dir`.
pub fn transfer_one(
    flow: &Flow,
    source: &Path,
    archive_dir: &Path,
    on_existing: OnExisting,
) -> TransferOutcome {
    match try_transfer(flow, source, archive_dir, on_existing) {
        Ok(outcome) => outcome,
        Err(error) => TransferOutcome::Failed {
            source: source.to_path_buf(),
            error,
        },
    }
}

fn try_transfer(
    flow: &Flow,
    source: &Path,
    archive_dir: &Path,
    on_existing: OnExisting,
) -> Result<TransferOutcome> {
    let file_name = source
        .file_name()
        .with_context(|| format!("source has no file name: {}", source.display()))?;
    let destination = flow
        .target_dir()
        .join(destination_file_name(file_name, flow.target_ext()));
    let archived = archive_dir.join(file_name);

    if on_existing == OnExisting::Skip && fs::symlink_metadata(&destination).is_ok() {
        return Ok(TransferOutcome::SkippedExisting { destination });
    }

    let target_dir = flow.target_dir();
    fs::create_dir_all(target_dir).map_err(io_error_with_help("create destination directory", target_dir))?;

    let staged = stage_copy(source, target_dir)?;
    if !place(staged, &destination, on_existing)? {
        // Appeared between the existence check and the rename.
        return Ok(TransferOutcome::SkippedExisting { destination });
    }

    relocate(source, &archived, on_existing)?;

    Ok(TransferOutcome::Delivered {
        destination,
        archived,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renamed(name: &str, ext: &str) -> String {
        destination_file_name(OsStr::new(name), ext)
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn rename_rules() {
        assert_eq!(renamed("report.txt", "occ"), "report.occ");
        assert_eq!(renamed("noext", "occ"), "noext.occ");
        assert_eq!(renamed("report.txt", ""), "report.txt");
        assert_eq!(renamed("a.b.TXT", "occ"), "a.b.occ");
        assert_eq!(renamed(".hidden", "occ"), ".hidden.occ");
        assert_eq!(renamed("x.ifm", "ifm"), "x.ifm");
    }

    #[test]
    fn overwrite_flag_maps_to_policy() {
        assert_eq!(OnExisting::from_overwrite_flag(true), OnExisting::Overwrite);
        assert_eq!(OnExisting::from_overwrite_flag(false), OnExisting::Skip);
    }
}
