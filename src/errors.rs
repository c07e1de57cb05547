//! Typed error definitions for zfin_bridge.
//! Startup failures are typed so the binary can pick an exit code and tests can
//! match on the exact condition. Per-file and per-flow failures stay `anyhow`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Problems with the configuration file or its values. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config line {line}: expected key=value, got: {content}")]
    MalformedLine { line: usize, content: String },

    #[error("Missing required key in config: {0}")]
    MissingKey(&'static str),

    #[error("Invalid integer value for {key}: {value}")]
    InvalidInteger { key: &'static str, value: String },

    #[error("Invalid value for {key}: must be >= {min}, got {value}")]
    OutOfRange {
        key: &'static str,
        min: i64,
        value: i64,
    },

    #[error("Invalid boolean value for {key}: {value}")]
    InvalidBoolean { key: &'static str, value: String },

    #[error("Invalid log level: '{0}' (expected quiet, normal, info or debug)")]
    InvalidLogLevel(String),

    #[error("Conflicting directories: {0}")]
    Conflict(String),
}

/// Failure to take the single-instance lock.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Another instance is already running (lock file: {})", .0.display())]
    AlreadyRunning(PathBuf),

    #[error("Lock file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Top-level startup error surfaced by the binary.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Config/arguments error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("Failed to initialize logging in {}: {source}", dir.display())]
    Logging {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create directory {}: {source}", path.display())]
    Bootstrap {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

impl BridgeError {
    /// Process exit status for this failure: 2 for configuration, 1 for everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            BridgeError::Config(_) => 2,
            _ => 1,
        }
    }

    /// Short stable tag for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::Config(_) => "config",
            BridgeError::Lock(LockError::AlreadyRunning(_)) => "already_running",
            BridgeError::Lock(LockError::Io { .. }) => "lock_io",
            BridgeError::Logging { .. } => "logging",
            BridgeError::Bootstrap { .. } => "bootstrap",
            BridgeError::Signal(_) => "signal",
        }
    }

    pub fn is_already_running(&self) -> bool {
        matches!(self, BridgeError::Lock(LockError::AlreadyRunning(_)))
    }
}
