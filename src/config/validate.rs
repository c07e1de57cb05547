//! Config validation logic.
//! Range checks happen while reading values; this pass checks how the derived
//! flows relate to each other.

use tracing::debug;

use super::types::Config;
use crate::errors::ConfigError;

impl Config {
    /// Reject layouts that would make a flow feed itself or another flow's outbox.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let [a, b] = self.flows();

        if a.source_dir() == b.source_dir() {
            return Err(ConfigError::Conflict(format!(
                "{} and {} share the source directory '{}'",
                a.name(),
                b.name(),
                a.source_dir().display()
            )));
        }
        for flow in [&a, &b] {
            if flow.source_dir() == flow.target_dir() {
                return Err(ConfigError::Conflict(format!(
                    "{} source and destination are the same directory '{}'",
                    flow.name(),
                    flow.source_dir().display()
                )));
            }
            if flow.archive_root() == flow.source_dir() {
                return Err(ConfigError::Conflict(format!(
                    "{} archive root must differ from its source directory '{}'",
                    flow.name(),
                    flow.source_dir().display()
                )));
            }
        }

        debug!(
            bank_root = %self.bank_root.display(),
            zfin_root = %self.zfin_root.display(),
            "Config validated"
        );
        Ok(())
    }
}
