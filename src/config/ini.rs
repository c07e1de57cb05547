//! key=value configuration file support.
//! - Reads `config.ini`-style files: `key = value`, `#`/`;` comments, `[section]` headers ignored.
//! - Maps raw values onto `Config`, applying defaults and range checks.
//!
//! Notes:
//! - Unknown keys are ignored; later duplicates win.
//! - Relative paths resolve against the directory holding the config file.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::paths::{absolute_normalized, resolve_against};
use super::types::{Config, LogLevel};
use crate::errors::ConfigError;
use crate::flow::normalize_ext;

/// Parsed key/value pairs with typed accessors.
#[derive(Debug, Default)]
pub struct RawConfig {
    values: HashMap<String, String>,
}

impl RawConfig {
    /// Parse config text. Errors carry the 1-based line number.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim().trim_start_matches('\u{feff}');
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                continue;
            }
            let Some(eq) = trimmed.find('=').filter(|&pos| pos > 0) else {
                return Err(ConfigError::MalformedLine {
                    line: line_no,
                    content: line.to_string(),
                });
            };
            let key = trimmed[..eq].trim();
            let value = unquote(trimmed[eq + 1..].trim());
            values.insert(key.to_string(), value.to_string());
        }
        Ok(Self { values })
    }

    /// Value for `key`, or None when absent or blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn required(&self, key: &'static str) -> Result<&str, ConfigError> {
        self.get(key).ok_or(ConfigError::MissingKey(key))
    }

    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    pub fn int_or(&self, key: &'static str, default: i64, min: i64) -> Result<i64, ConfigError> {
        let Some(raw) = self.get(key) else {
            return Ok(default);
        };
        let parsed: i64 = raw.trim().parse().map_err(|_| ConfigError::InvalidInteger {
            key,
            value: raw.to_string(),
        })?;
        if parsed < min {
            return Err(ConfigError::OutOfRange {
                key,
                min,
                value: parsed,
            });
        }
        Ok(parsed)
    }

    pub fn bool_or(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        let Some(raw) = self.get(key) else {
            return Ok(default);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidBoolean {
                key,
                value: raw.to_string(),
            }),
        }
    }
}

/// Strip one pair of matching surrounding quotes.
fn unquote(value: &str) -> &str {
    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

impl Config {
    /// Load, default, range-check and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = absolute_normalized(path);
        if fs::symlink_metadata(&source).is_err() {
            return Err(ConfigError::NotFound(source));
        }
        let content = fs::read_to_string(&source).map_err(|e| ConfigError::Read {
            path: source.clone(),
            source: e,
        })?;
        let raw = RawConfig::parse(&content)?;
        let base_dir = source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| absolute_normalized(Path::new(".")));
        debug!(path = %source.display(), keys = raw.values.len(), "Parsed config file");

        let cfg = Self::from_raw(&raw, &base_dir, source)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_raw(raw: &RawConfig, base_dir: &Path, source: std::path::PathBuf) -> Result<Self, ConfigError> {
        let log_level = match raw.get("log_level") {
            Some(s) => LogLevel::parse(s).ok_or_else(|| ConfigError::InvalidLogLevel(s.to_string()))?,
            None => LogLevel::Normal,
        };

        Ok(Self {
            source,
            bank_root: resolve_against(base_dir, raw.required("bank_root")?),
            bank_out_dir: raw.string_or("bank_out_dir", "OUT"),
            bank_in_dir: raw.string_or("bank_in_dir", "IN"),
            bank_archive_dir: raw.string_or("bank_archive_dir", "ARH"),
            zfin_root: resolve_against(base_dir, raw.required("zfin_root")?),
            zfin_in_dir: raw.string_or("zfin_in_dir", "in"),
            zfin_out_dir: raw.string_or("zfin_out_dir", "out"),
            zfin_archive_dir: raw.string_or("zfin_archive_dir", "arc"),
            bank_to_zfin_source_ext: normalize_ext(&raw.string_or("bank_to_zfin_source_ext", "txt")),
            bank_to_zfin_target_ext: normalize_ext(&raw.string_or("bank_to_zfin_target_ext", "occ")),
            zfin_to_bank_source_ext: normalize_ext(&raw.string_or("zfin_to_bank_source_ext", "ifm")),
            zfin_to_bank_target_ext: normalize_ext(&raw.string_or("zfin_to_bank_target_ext", "ifm")),
            poll_interval: Duration::from_secs(raw.int_or("poll_interval_seconds", 60, 1)? as u64),
            min_file_age: Duration::from_secs(raw.int_or("min_file_age_seconds", 2, 0)? as u64),
            max_files_per_cycle: raw.int_or("max_files_per_cycle", 0, 0)? as usize,
            overwrite_existing: raw.bool_or("overwrite_existing", true)?,
            archive_retention_days: raw.int_or("archive_retention_days", 90, 0)?.min(u32::MAX as i64) as u32,
            lock_file: resolve_against(base_dir, &raw.string_or("lock_file", "runtime/zfin-bridge.lock")),
            log_dir: resolve_against(base_dir, &raw.string_or("log_dir", "logs")),
            log_rotate_bytes: raw.int_or("log_rotate_bytes", 10_485_760, 1024)? as u64,
            log_rotate_files: raw.int_or("log_rotate_files", 10, 1)?.min(u32::MAX as i64) as u32,
            log_level,
        })
    }
}
