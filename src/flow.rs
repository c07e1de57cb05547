//! One direction of the relay and its per-cycle batch.
//!
//! A batch scans the source folder, trims the working set to the cycle cap,
//! computes a single dated archive folder and transfers candidates in scan order.
//! Per-file failures are counted in the summary; only listing or archive-folder
//! creation errors abort the batch.

use anyhow::Result;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{error, info, warn};

use crate::errors::BridgeError;
use crate::fs_ops::io_error_with_help;
use crate::fs_ops::retention::ARCHIVE_DATE_FORMAT;
use crate::fs_ops::scan::list_candidates;
use crate::fs_ops::transfer::{OnExisting, TransferOutcome, transfer_one};
use crate::shutdown::Shutdown;

/// Archive sub-folder used when the source directory has no usable leaf name (e.g. `/`).
const FALLBACK_ARCHIVE_LEAF: &str = "files";

/// Normalize an extension filter: trimmed, lower-case, without leading dots.
pub fn normalize_ext(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_ascii_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flow {
    name: String,
    source_dir: PathBuf,
    source_ext: String,
    target_dir: PathBuf,
    target_ext: String,
    archive_root: PathBuf,
}

/// Settings shared by every batch.
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub min_file_age: Duration,
    /// 0 = unbounded
    pub max_files_per_cycle: usize,
    pub on_existing: OnExisting,
}

/// Per-flow counts for one cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    /// Eligible candidates seen by the scan (before the cap)
    pub found: usize,
    /// Candidates attempted this cycle
    pub processed: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

impl Flow {
    pub fn new(
        name: &str,
        source_dir: PathBuf,
        source_ext: &str,
        target_dir: PathBuf,
        target_ext: &str,
        archive_root: PathBuf,
    ) -> Self {
        Self {
            name: name.to_string(),
            source_dir,
            source_ext: normalize_ext(source_ext),
            target_dir,
            target_ext: normalize_ext(target_ext),
            archive_root,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn source_ext(&self) -> &str {
        &self.source_ext
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    pub fn target_ext(&self) -> &str {
        &self.target_ext
    }

    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    /// `archive_root/<yyyy-MM-dd>/<source leaf>` for a batch processed on `day`.
    pub fn archive_dir_for(&self, day: NaiveDate) -> PathBuf {
        let leaf = self
            .source_dir
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| FALLBACK_ARCHIVE_LEAF.into());
        self.archive_root
            .join(day.format(ARCHIVE_DATE_FORMAT).to_string())
            .join(leaf)
    }

    /// Create the source, destination and archive root if missing.
    pub fn ensure_directories(&self) -> Result<(), BridgeError> {
        for dir in [&self.source_dir, &self.target_dir, &self.archive_root] {
            if dir.is_dir() {
                continue;
            }
            fs::create_dir_all(dir).map_err(|source| BridgeError::Bootstrap {
                path: dir.clone(),
                source,
            })?;
            info!(flow = %self.name, path = %dir.display(), "Created directory: {}", dir.display());
        }
        Ok(())
    }

    /// Run one batch. `today` names the archive folder, `now` drives the age filter.
    /// Stops before the next file once a shutdown has been requested.
    pub fn process(
        &self,
        opts: &BatchOptions,
        today: NaiveDate,
        now: SystemTime,
        shutdown: &Shutdown,
    ) -> Result<BatchSummary> {
        let mut candidates = list_candidates(&self.source_dir, &self.source_ext, opts.min_file_age, now)?;
        let mut summary = BatchSummary {
            found: candidates.len(),
            ..BatchSummary::default()
        };
        if candidates.is_empty() {
            return Ok(summary);
        }
        if opts.max_files_per_cycle > 0 && candidates.len() > opts.max_files_per_cycle {
            candidates.truncate(opts.max_files_per_cycle);
        }
        info!(
            flow = %self.name,
            found = summary.found,
            processing = candidates.len(),
            "[{}] found {} file(s), processing {}",
            self.name,
            summary.found,
            candidates.len()
        );

        let archive_dir = self.archive_dir_for(today);
        fs::create_dir_all(&archive_dir).map_err(io_error_with_help("create archive directory", &archive_dir))?;

        for candidate in candidates {
            if shutdown.is_requested() {
                info!(flow = %self.name, "Shutdown requested; leaving remaining files for the next run");
                break;
            }
            summary.processed += 1;
            match transfer_one(self, &candidate.path, &archive_dir, opts.on_existing) {
                TransferOutcome::Delivered { destination, archived } => {
                    summary.delivered += 1;
                    info!(
                        flow = %self.name,
                        path = %candidate.path.display(),
                        destination = %destination.display(),
                        archive = %archived.display(),
                        "[{}] moved {} -> {}",
                        self.name,
                        candidate.path.display(),
                        destination.display()
                    );
                }
                TransferOutcome::SkippedExisting { destination } => {
                    summary.skipped += 1;
                    warn!(
                        flow = %self.name,
                        path = %candidate.path.display(),
                        destination = %destination.display(),
                        "[{}] destination exists, skipping (overwrite disabled): {}",
                        self.name,
                        destination.display()
                    );
                }
                TransferOutcome::Failed { source, error } => {
                    summary.failed += 1;
                    error!(
                        flow = %self.name,
                        path = %source.display(),
                        error = %format!("{error:#}"),
                        "[{}] failed to transfer {}",
                        self.name,
                        source.display()
                    );
                }
            }
        }
        Ok(summary)
    }
}
