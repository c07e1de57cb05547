//! Config module.
//! Provides configuration types, config file lookup, key=value loading, and validation.

pub mod ini;
pub mod paths;
pub mod types;
mod validate;

pub use ini::RawConfig;
pub use paths::{CONFIG_ENV, resolve_config_path};
pub use types::{Config, LogLevel};
