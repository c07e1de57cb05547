//! Core configuration types.
//! - Config holds the validated, immutable runtime settings.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::flow::Flow;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Runtime configuration, fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct Config {
    /// File the settings were read from (absolute)
    pub source: PathBuf,
    pub bank_root: PathBuf,
    pub bank_out_dir: String,
    pub bank_in_dir: String,
    pub bank_archive_dir: String,
    pub zfin_root: PathBuf,
    pub zfin_in_dir: String,
    pub zfin_out_dir: String,
    pub zfin_archive_dir: String,
    pub bank_to_zfin_source_ext: String,
    pub bank_to_zfin_target_ext: String,
    pub zfin_to_bank_source_ext: String,
    pub zfin_to_bank_target_ext: String,
    /// Sleep between cycles in continuous mode
    pub poll_interval: Duration,
    /// Files younger than this are left for the next cycle
    pub min_file_age: Duration,
    /// Per-flow cap per cycle; 0 = unbounded
    pub max_files_per_cycle: usize,
    pub overwrite_existing: bool,
    /// Archive date-folders older than this many days are swept; 0 = never
    pub archive_retention_days: u32,
    pub lock_file: PathBuf,
    pub log_dir: PathBuf,
    pub log_rotate_bytes: u64,
    pub log_rotate_files: u32,
    pub log_level: LogLevel,
}

impl Config {
    /// BANK->ZFIN: bank outbox to zfin inbox, originals archived under the bank root.
    pub fn bank_to_zfin(&self) -> Flow {
        Flow::new(
            "BANK->ZFIN",
            join_dir(&self.bank_root, &self.bank_out_dir),
            &self.bank_to_zfin_source_ext,
            join_dir(&self.zfin_root, &self.zfin_in_dir),
            &self.bank_to_zfin_target_ext,
            join_dir(&self.bank_root, &self.bank_archive_dir),
        )
    }

    /// ZFIN->BANK: zfin outbox to bank inbox, originals archived under the zfin root.
    pub fn zfin_to_bank(&self) -> Flow {
        Flow::new(
            "ZFIN->BANK",
            join_dir(&self.zfin_root, &self.zfin_out_dir),
            &self.zfin_to_bank_source_ext,
            join_dir(&self.bank_root, &self.bank_in_dir),
            &self.zfin_to_bank_target_ext,
            join_dir(&self.zfin_root, &self.zfin_archive_dir),
        )
    }

    /// Both directions in processing order.
    pub fn flows(&self) -> [Flow; 2] {
        [self.bank_to_zfin(), self.zfin_to_bank()]
    }
}

/// An empty subdirectory name means the root itself.
fn join_dir(root: &Path, child: &str) -> PathBuf {
    let child = child.trim();
    if child.is_empty() {
        root.to_path_buf()
    } else {
        root.join(child)
    }
}
