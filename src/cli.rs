//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - --debug is a shorthand for --log-level debug and wins over it.
//! - clap exits with status 2 on argument errors.

use clap::{Parser, ValueHint};
use std::path::PathBuf;

use crate::config::types::{Config, LogLevel};

/// Relay files between the Bank and ZFIN exchange folders.
/// Settings come from a key=value config file; flags override logging only.
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "zfin-bridge",
    author,
    version,
    about = "Relay files between Bank and ZFIN folders with dated archives"
)]
pub struct Args {
    /// Config file (default: $ZFIN_BRIDGE_CONFIG, ./config.ini, then the user config dir).
    #[arg(long, short = 'c', value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Run a single cycle and exit; otherwise poll until interrupted.
    #[arg(long, help = "Run one cycle and exit (status 1 if anything failed)")]
    pub once: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, value_name = "LEVEL", value_parser = parse_level, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<LogLevel>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, help = "Emit logs in structured JSON")]
    pub json: bool,

    /// Print which config file would be used, then exit.
    #[arg(long, help = "Print the config file location and exit")]
    pub print_config: bool,
}

fn parse_level(s: &str) -> Result<LogLevel, String> {
    s.parse()
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config value).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let args = Args::try_parse_from([
            "zfin-bridge",
            "--config",
            "/etc/zfin/config.ini",
            "--once",
            "--log-level",
            "info",
            "--json",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/etc/zfin/config.ini")));
        assert!(args.once);
        assert!(args.json);
        assert_eq!(args.effective_log_level(), Some(LogLevel::Info));
    }

    #[test]
    fn debug_wins_over_log_level() {
        let args = Args::try_parse_from(["zfin-bridge", "--log-level", "quiet", "-d"]).unwrap();
        assert_eq!(args.effective_log_level(), Some(LogLevel::Debug));
    }

    #[test]
    fn rejects_unknown_level() {
        let err = Args::try_parse_from(["zfin-bridge", "--log-level", "loud"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn no_flags_means_no_override() {
        let args = Args::try_parse_from(["zfin-bridge"]).unwrap();
        assert!(!args.once);
        assert_eq!(args.effective_log_level(), None);
    }
}
