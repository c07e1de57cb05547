//! Config file lookup and path resolution helpers.

use dirs::config_dir;
use std::env;
use std::path::{Component, Path, PathBuf};

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV: &str = "ZFIN_BRIDGE_CONFIG";
/// Config file name looked up in the working directory and the OS config dir.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Resolve which config file to use.
///
/// Precedence:
///  1) `explicit` (the `--config` flag)
///  2) `$ZFIN_BRIDGE_CONFIG`
///  3) `./config.ini` when it exists
///  4) `<config dir>/zfin_bridge/config.ini` (falls back to `./config.ini` when no config dir exists)
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return absolute_normalized(p);
    }
    if let Some(p) = env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return absolute_normalized(Path::new(&p));
    }
    let local = absolute_normalized(Path::new(CONFIG_FILE_NAME));
    if local.exists() {
        return local;
    }
    match config_dir() {
        Some(base) => base.join("zfin_bridge").join(CONFIG_FILE_NAME),
        None => local,
    }
}

/// Resolve `raw` against `base` when relative, then normalize lexically.
pub fn resolve_against(base: &Path, raw: &str) -> PathBuf {
    let p = Path::new(raw.trim());
    if p.is_absolute() {
        normalize(p)
    } else {
        normalize(&base.join(p))
    }
}

/// Make `p` absolute against the working directory and normalize lexically.
pub fn absolute_normalized(p: &Path) -> PathBuf {
    let abs = std::path::absolute(p).unwrap_or_else(|_| p.to_path_buf());
    normalize(&abs)
}

/// Remove `.` segments and fold `..` into its parent without touching the filesystem.
fn normalize(p: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in p.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(comp);
                }
            }
            other => out.push(other),
        }
    }
    out
}
