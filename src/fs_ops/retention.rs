//! Archive retention.
//!
//! Archive roots hold one folder per processing day (`yyyy-MM-dd`). Folders whose
//! date is strictly before `today - horizon` are removed, children first. Anything
//! else directly under the root (non-date names, plain files) is never touched.
//!
//! Notes:
//! - Symlinks are never followed. A symlink named like an expired date is removed
//!   as a link; symlinks inside a doomed folder are unlinked, not descended.
//! - Deletion is best-effort: a failing entry is counted and logged, the rest of
//!   the folder and the remaining folders still go.
//! - The sweep runs at most once per calendar day per process (`RetentionCursor`).

use chrono::{Duration as ChronoDuration, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use walkdir::WalkDir;

/// Archive folder date format; also used when creating folders.
pub const ARCHIVE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Remembers the last day a sweep ran. Starts empty, so the first cycle of a
/// process always sweeps.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RetentionCursor {
    last_run: Option<NaiveDate>,
}

impl RetentionCursor {
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.last_run != Some(today)
    }

    pub fn mark(&mut self, today: NaiveDate) {
        self.last_run = Some(today);
    }

    pub fn last_run(&self) -> Option<NaiveDate> {
        self.last_run
    }
}

/// Counts from one sweep across all roots.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Date folders removed completely
    pub deleted: Vec<PathBuf>,
    /// Entries (files, links or folders) that could not be removed
    pub failed: usize,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    fn merge(&mut self, other: SweepReport) {
        self.deleted.extend(other.deleted);
        self.failed += other.failed;
    }
}

/// Parse an archive folder name. Only the exact zero-padded form counts.
pub fn parse_archive_date(name: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(name, ARCHIVE_DATE_FORMAT).ok()?;
    (date.format(ARCHIVE_DATE_FORMAT).to_string() == name).then_some(date)
}

/// Sweep every root if `horizon_days > 0` and the cursor says today has not run yet.
/// Returns None when nothing ran. The cursor advances even when deletions fail.
pub fn sweep_if_due(
    cursor: &mut RetentionCursor,
    roots: &[&Path],
    horizon_days: u32,
    today: NaiveDate,
) -> Option<SweepReport> {
    if horizon_days == 0 || !cursor.is_due(today) {
        return None;
    }
    let mut report = SweepReport::default();
    for root in roots {
        report.merge(sweep_root(root, horizon_days, today));
    }
    cursor.mark(today);
    Some(report)
}

/// Delete expired date folders directly under `root`.
pub fn sweep_root(root: &Path, horizon_days: u32, today: NaiveDate) -> SweepReport {
    let mut report = SweepReport::default();
    let entries = match fs::read_dir(root) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return report,
        Err(e) => {
            error!(root = %root.display(), error = %e, "[RETENTION] cleanup error");
            report.failed += 1;
            return report;
        }
    };
    let threshold = today
        .checked_sub_signed(ChronoDuration::days(i64::from(horizon_days)))
        .unwrap_or(NaiveDate::MIN);

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let name = entry.file_name();
        let Some(date) = name.to_str().and_then(parse_archive_date) else {
            continue;
        };
        if date >= threshold {
            continue;
        }

        if file_type.is_symlink() {
            match fs::remove_file(&path) {
                Ok(()) => {
                    info!(path = %path.display(), "[RETENTION] removed archive link");
                    report.deleted.push(path);
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "[RETENTION] failed to remove link");
                    report.failed += 1;
                }
            }
            continue;
        }
        if !file_type.is_dir() {
            continue;
        }

        let failed = delete_tree(&path);
        if failed == 0 {
            info!(path = %path.display(), "[RETENTION] deleted archive folder");
            report.deleted.push(path);
        } else {
            error!(path = %path.display(), failed, "[RETENTION] archive folder only partly deleted");
            report.failed += failed;
        }
    }
    report
}

/// Post-order removal of `root`. Returns how many entries could not be removed.
fn delete_tree(root: &Path) -> usize {
    let mut failed = 0;
    for entry in WalkDir::new(root).follow_links(false).contents_first(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(root = %root.display(), error = %e, "Walk error during retention");
                failed += 1;
                continue;
            }
        };
        let path = entry.path();
        let res = if entry.file_type().is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        };
        match res {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Failed to delete archive entry");
                failed += 1;
            }
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_only_exact_dates() {
        assert_eq!(parse_archive_date("2024-03-01"), Some(d(2024, 3, 1)));
        assert_eq!(parse_archive_date("2024-3-1"), None);
        assert_eq!(parse_archive_date("2024-02-30"), None);
        assert_eq!(parse_archive_date("keep-me"), None);
        assert_eq!(parse_archive_date("2024-03-01x"), None);
    }

    #[test]
    fn cursor_gates_once_per_day() {
        let mut c = RetentionCursor::default();
        assert!(c.is_due(d(2024, 1, 1)));
        c.mark(d(2024, 1, 1));
        assert!(!c.is_due(d(2024, 1, 1)));
        assert!(c.is_due(d(2024, 1, 2)));
        assert_eq!(c.last_run(), Some(d(2024, 1, 1)));
    }

    #[test]
    fn zero_horizon_disables_and_leaves_cursor() {
        let td = tempdir().unwrap();
        fs::create_dir(td.path().join("2000-01-01")).unwrap();
        let mut c = RetentionCursor::default();
        assert!(sweep_if_due(&mut c, &[td.path()], 0, d(2024, 1, 10)).is_none());
        assert!(td.path().join("2000-01-01").exists());
        assert!(c.last_run().is_none());
    }

    #[test]
    fn missing_root_is_clean() {
        let td = tempdir().unwrap();
        let report = sweep_root(&td.path().join("absent"), 5, d(2024, 1, 10));
        assert!(report.is_clean());
        assert!(report.deleted.is_empty());
    }

    #[test]
    fn deletes_nested_content_children_first() {
        let td = tempdir().unwrap();
        let doomed = td.path().join("2024-01-01");
        fs::create_dir_all(doomed.join("OUT").join("deep")).unwrap();
        fs::write(doomed.join("OUT").join("a.txt"), b"a").unwrap();
        fs::write(doomed.join("OUT").join("deep").join("b.txt"), b"b").unwrap();

        let report = sweep_root(td.path(), 5, d(2024, 1, 10));
        assert!(report.is_clean());
        assert_eq!(report.deleted, vec![doomed.clone()]);
        assert!(!doomed.exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_dirs_are_not_followed() {
        let td = tempdir().unwrap();
        let outside = td.path().join("outside");
        fs::create_dir(&outside).unwrap();
        fs::write(outside.join("precious.txt"), b"keep").unwrap();

        let root = td.path().join("arc");
        let doomed = root.join("2024-01-01");
        fs::create_dir_all(&doomed).unwrap();
        std::os::unix::fs::symlink(&outside, doomed.join("link")).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("2024-01-02")).unwrap();

        let report = sweep_root(&root, 5, d(2024, 1, 10));
        assert!(report.is_clean());
        assert!(!doomed.exists());
        assert!(!root.join("2024-01-02").exists());
        assert!(outside.join("precious.txt").exists());
    }
}
