//! Startup reconciliation.
//! Removes staged copies (`.zfin_bridge.*.part`) left in destination directories
//! by a crash mid-copy. Runs once after the instance lock is held, so no other
//! bridge can be writing those files.

use std::fs;
use std::path::Path;
use tracing::{info, warn};

use super::atomic::{TEMP_PREFIX, TEMP_SUFFIX};

fn is_staged_temp(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}

/// Remove leftover staged files directly inside `dir`. Returns how many were removed.
pub fn cleanup_staged_temps(dir: &Path) -> usize {
    let rd = match fs::read_dir(dir) {
        Ok(r) => r,
        Err(_) => return 0,
    };
    let mut removed = 0;
    for entry in rd.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !is_staged_temp(name) {
            continue;
        }
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "Removed leftover partial copy");
                removed += 1;
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Could not remove leftover partial copy"),
        }
    }
    removed
}
