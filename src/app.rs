//! Application orchestrator.
//! Resolves and loads the config, initializes logging, installs the signal handler,
//! takes the instance lock, bootstraps directories and runs the scheduler.
//!
//! Exit status: 0 on success or clean shutdown, 2 for config/argument errors,
//! 1 for any other fatal error or a one-shot cycle that did not complete cleanly.

use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use zfin_bridge::cli::Args;
use zfin_bridge::output as out;
use zfin_bridge::{
    BridgeError, Config, EngineContext, InstanceLock, Scheduler, Shutdown, resolve_config_path,
};

use crate::logging::init_tracing;

/// Run the CLI application.
pub fn run(args: Args) -> ExitCode {
    match try_run(&args) {
        Ok(code) => code,
        Err(e) => {
            out::print_error(&e.to_string());
            ExitCode::from(e.exit_code())
        }
    }
}

fn try_run(args: &Args) -> Result<ExitCode, BridgeError> {
    let cfg_path = resolve_config_path(args.config.as_deref());

    // Handle --print-config before loading anything
    if args.print_config {
        out::print_info(&format!("zfin-bridge config path:\n  {}\n", cfg_path.display()));
        if cfg_path.exists() {
            out::print_info("A config file exists at that location.");
        } else {
            out::print_info("No config file exists there yet. Pass --config or set ZFIN_BRIDGE_CONFIG.");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut cfg = Config::load(&cfg_path)?;
    args.apply_overrides(&mut cfg);

    let mut guard = Some(init_tracing(&cfg, args.json)?);
    info!(
        config = %cfg.source.display(),
        mode = if args.once { "once" } else { "continuous" },
        version = env!("CARGO_PKG_VERSION"),
        "zfin-bridge starting"
    );

    let result = run_engine(&cfg, args.once, &mut guard);
    if let Err(e) = &result {
        error!(kind = e.kind(), code = e.exit_code(), error = %e, "Fatal error");
    }
    drop(guard);
    result
}

/// Everything after logging is up. Once startup has succeeded the guard moves into
/// the engine context, which drops it after the lock so the last log lines are
/// flushed. Until then it stays with the caller, which may still have errors to log.
fn run_engine(
    cfg: &Config,
    once: bool,
    guard: &mut Option<WorkerGuard>,
) -> Result<ExitCode, BridgeError> {
    let shutdown = Shutdown::new();
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            warn!("Termination signal received; finishing current file and shutting down");
            shutdown.request();
        })?;
    }

    let lock = InstanceLock::acquire(&cfg.lock_file)?;
    let mut scheduler = Scheduler::from_config(cfg, EngineContext::new(lock, shutdown));
    for flow in scheduler.flows() {
        info!(
            flow = flow.name(),
            source = %flow.source_dir().display(),
            destination = %flow.target_dir().display(),
            archive = %flow.archive_root().display(),
            "[{}] {} (*.{}) -> {} (*.{})",
            flow.name(),
            flow.source_dir().display(),
            flow.source_ext(),
            flow.target_dir().display(),
            flow.target_ext()
        );
    }
    scheduler.bootstrap()?;
    scheduler.context_mut().log_guard = guard.take();

    let code = if once {
        let report = scheduler.run_once();
        if report.is_clean() {
            info!(delivered = report.delivered(), "One-shot cycle finished");
            ExitCode::SUCCESS
        } else {
            error!(delivered = report.delivered(), "One-shot cycle finished with errors");
            ExitCode::from(1)
        }
    } else {
        scheduler.run_forever();
        ExitCode::SUCCESS
    };

    info!("zfin-bridge stopped");
    drop(scheduler.into_context());
    Ok(code)
}
