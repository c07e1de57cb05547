//! Core library for `zfin_bridge`.
//!
//! Relays files between the Bank and ZFIN exchange folders in both directions,
//! archives every original under a dated folder and prunes old archives.
//! The binary (`zfin-bridge`) only wires these pieces together:
//! config -> logging -> signal handler -> instance lock -> scheduler.

pub mod cli;
pub mod config;
pub mod errors;
pub mod flow;
pub mod fs_ops;
pub mod log_sink;
pub mod output;
pub mod platform;
pub mod scheduler;
pub mod shutdown;

pub use config::{Config, LogLevel, resolve_config_path};
pub use errors::{BridgeError, ConfigError, LockError};
pub use flow::{BatchOptions, BatchSummary, Flow};
pub use fs_ops::{InstanceLock, OnExisting, RetentionCursor, SweepReport, TransferOutcome};
pub use scheduler::{CycleReport, EngineContext, FlowResult, Scheduler};
pub use shutdown::Shutdown;
