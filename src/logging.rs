//! Tracing initialization.
//! Builds a subscriber with an EnvFilter, a stdout layer and a rotating file layer.
//!
//! Behavior:
//! - Log level is driven by LogLevel (no RUST_LOG override here).
//! - JSON/non-JSON formatting is selected via the `json` flag and applies to both layers.
//! - The file layer writes `<log_dir>/zfin-bridge.<n>.log` through a non-blocking worker;
//!   the returned WorkerGuard must outlive every log call to flush on exit.

use chrono::Local;
use std::fmt as stdfmt;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt as tsfmt;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry;
use tracing_subscriber::util::SubscriberInitExt;

use zfin_bridge::LogLevel;
use zfin_bridge::config::Config;
use zfin_bridge::errors::BridgeError;
use zfin_bridge::log_sink::{LOG_FILE_STEM, RotatingFile};

/// Local timestamps as `yyyy-MM-dd HH:mm:ss`.
struct LocalTime;
impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut tsfmt::format::Writer<'_>) -> stdfmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

#[inline]
fn to_level_filter(lvl: LogLevel) -> LevelFilter {
    match lvl {
        LogLevel::Quiet => LevelFilter::ERROR,
        LogLevel::Normal => LevelFilter::INFO,
        LogLevel::Info => LevelFilter::DEBUG,
        LogLevel::Debug => LevelFilter::TRACE,
    }
}

#[inline]
fn env_filter_from_level(level_filter: LevelFilter) -> EnvFilter {
    EnvFilter::default().add_directive(level_filter.into())
}

/// Initialize tracing for the configured level and log directory.
/// Fails only if the log directory or live log file cannot be opened.
pub fn init_tracing(cfg: &Config, json: bool) -> Result<WorkerGuard, BridgeError> {
    let env_filter = env_filter_from_level(to_level_filter(cfg.log_level));

    let sink = RotatingFile::open(
        &cfg.log_dir,
        LOG_FILE_STEM,
        cfg.log_rotate_bytes,
        cfg.log_rotate_files,
    )
    .map_err(|source| BridgeError::Logging {
        dir: cfg.log_dir.clone(),
        source,
    })?;
    let (writer, guard) = tracing_appender::non_blocking(sink);

    if json {
        let stdout_layer = tsfmt::layer()
            .event_format(tsfmt::format().json())
            .with_timer(LocalTime)
            .with_level(true)
            .with_target(false);
        let file_layer = tsfmt::layer()
            .event_format(tsfmt::format().json())
            .with_timer(LocalTime)
            .with_level(true)
            .with_target(false)
            .with_writer(writer);
        // try_init: a subscriber may already be set (e.g. by a test harness).
        let _ = registry()
            .with(env_filter)
            .with(stdout_layer)
            .with(file_layer)
            .try_init();
    } else {
        let stdout_layer = tsfmt::layer()
            .with_timer(LocalTime)
            .with_level(true)
            .with_target(false)
            .compact();
        let file_layer = tsfmt::layer()
            .with_timer(LocalTime)
            .with_level(true)
            .with_target(false)
            .with_ansi(false)
            .compact()
            .with_writer(writer);
        let _ = registry()
            .with(env_filter)
            .with(stdout_layer)
            .with(file_layer)
            .try_init();
    }
    Ok(guard)
}
