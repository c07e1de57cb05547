//! Filesystem operations: scanning, transfer, retention, locking.

mod atomic;
mod helpers;
pub mod lock;
pub mod reconcile;
pub mod retention;
pub mod scan;
pub mod transfer;

pub use helpers::io_error_with_help;
pub use lock::InstanceLock;
pub use reconcile::cleanup_staged_temps;
pub use retention::{RetentionCursor, SweepReport, parse_archive_date, sweep_if_due, sweep_root};
pub use scan::{Candidate, list_candidates, matches_extension};
pub use transfer::{OnExisting, TransferOutcome, destination_file_name, transfer_one};
