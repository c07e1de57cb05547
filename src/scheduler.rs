//! Cycle driver.
//!
//! One cycle runs BANK->ZFIN, then ZFIN->BANK, then the daily retention check.
//! Continuous mode sleeps `poll_interval` between cycles and stops as soon as a
//! shutdown is requested; a cycle in progress finishes its current file first.
//!
//! All process-wide state (instance lock, shutdown handle, retention cursor,
//! log flush guard) lives in `EngineContext`, owned by the scheduler.

use chrono::{DateTime, Local};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;

use crate::config::Config;
use crate::errors::BridgeError;
use crate::flow::{BatchOptions, BatchSummary, Flow};
use crate::fs_ops::lock::InstanceLock;
use crate::fs_ops::reconcile::cleanup_staged_temps;
use crate::fs_ops::retention::{RetentionCursor, SweepReport, sweep_if_due};
use crate::fs_ops::transfer::OnExisting;
use crate::shutdown::Shutdown;

/// Process-wide state, built once at startup and dropped on exit.
/// Field order is drop order: the lock goes first, the log guard flushes last.
#[derive(Debug)]
pub struct EngineContext {
    pub lock: InstanceLock,
    pub shutdown: Shutdown,
    pub retention: RetentionCursor,
    pub log_guard: Option<WorkerGuard>,
}

impl EngineContext {
    pub fn new(lock: InstanceLock, shutdown: Shutdown) -> Self {
        Self {
            lock,
            shutdown,
            retention: RetentionCursor::default(),
            log_guard: None,
        }
    }
}

/// Outcome of one flow in one cycle.
#[derive(Debug)]
pub struct FlowResult {
    pub flow: String,
    pub outcome: anyhow::Result<BatchSummary>,
}

impl FlowResult {
    pub fn is_clean(&self) -> bool {
        matches!(&self.outcome, Ok(summary) if summary.is_clean())
    }
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub flows: Vec<FlowResult>,
    /// None when retention did not run this cycle
    pub retention: Option<SweepReport>,
}

impl CycleReport {
    /// False if a flow errored, a file failed or a retention deletion failed.
    pub fn is_clean(&self) -> bool {
        self.flows.iter().all(FlowResult::is_clean)
            && self.retention.as_ref().is_none_or(SweepReport::is_clean)
    }

    pub fn delivered(&self) -> usize {
        self.flows
            .iter()
            .filter_map(|f| f.outcome.as_ref().ok())
            .map(|s| s.delivered)
            .sum()
    }
}

pub struct Scheduler {
    flows: [Flow; 2],
    opts: BatchOptions,
    retention_days: u32,
    poll_interval: Duration,
    ctx: EngineContext,
}

impl Scheduler {
    pub fn new(
        flows: [Flow; 2],
        opts: BatchOptions,
        retention_days: u32,
        poll_interval: Duration,
        ctx: EngineContext,
    ) -> Self {
        Self {
            flows,
            opts,
            retention_days,
            poll_interval,
            ctx,
        }
    }

    pub fn from_config(cfg: &Config, ctx: EngineContext) -> Self {
        let opts = BatchOptions {
            min_file_age: cfg.min_file_age,
            max_files_per_cycle: cfg.max_files_per_cycle,
            on_existing: OnExisting::from_overwrite_flag(cfg.overwrite_existing),
        };
        Self::new(
            cfg.flows(),
            opts,
            cfg.archive_retention_days,
            cfg.poll_interval,
            ctx,
        )
    }

    pub fn flows(&self) -> &[Flow; 2] {
        &self.flows
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.ctx
    }

    /// Hand the context back, e.g. to drop the lock and flush logs in a chosen order.
    pub fn into_context(self) -> EngineContext {
        self.ctx
    }

    /// Create missing flow directories and clear leftover partial copies.
    pub fn bootstrap(&self) -> Result<(), BridgeError> {
        for flow in &self.flows {
            flow.ensure_directories()?;
        }
        for flow in &self.flows {
            let removed = cleanup_staged_temps(flow.target_dir());
            if removed > 0 {
                info!(flow = flow.name(), removed, "Cleaned up partial copies from an earlier run");
            }
        }
        Ok(())
    }

    pub fn run_cycle(&mut self) -> CycleReport {
        self.run_cycle_at(Local::now())
    }

    /// Run one cycle as if the wall clock read `now`.
    pub fn run_cycle_at(&mut self, now: DateTime<Local>) -> CycleReport {
        let today = now.date_naive();
        let wall: SystemTime = now.into();
        let mut report = CycleReport::default();

        for flow in &self.flows {
            if self.ctx.shutdown.is_requested() {
                debug!(flow = flow.name(), "Shutdown requested; flow not started");
                break;
            }
            let outcome = flow.process(&self.opts, today, wall, &self.ctx.shutdown);
            if let Err(e) = &outcome {
                error!(
                    flow = flow.name(),
                    path = %flow.source_dir().display(),
                    error = %format!("{e:#}"),
                    "[{}] flow error",
                    flow.name()
                );
            }
            report.flows.push(FlowResult {
                flow: flow.name().to_string(),
                outcome,
            });
        }

        if !self.ctx.shutdown.is_requested() {
            let roots: Vec<&Path> = self.flows.iter().map(Flow::archive_root).collect();
            report.retention = sweep_if_due(&mut self.ctx.retention, &roots, self.retention_days, today);
            if let Some(sweep) = &report.retention {
                debug!(deleted = sweep.deleted.len(), failed = sweep.failed, "Retention check finished");
            }
        }
        report
    }

    /// One-shot mode: a single cycle.
    pub fn run_once(&mut self) -> CycleReport {
        self.run_cycle()
    }

    /// Continuous mode: cycle, sleep, repeat until shutdown.
    pub fn run_forever(&mut self) {
        info!(
            poll_seconds = self.poll_interval.as_secs(),
            "Running continuously; press Ctrl-C to stop"
        );
        while !self.ctx.shutdown.is_requested() {
            self.run_cycle();
            if self.ctx.shutdown.sleep(self.poll_interval) {
                break;
            }
        }
        info!("Shutdown requested; stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::tempdir;

    fn scheduler_in(root: &Path) -> Scheduler {
        let flows = [
            Flow::new(
                "BANK->ZFIN",
                root.join("bank/OUT"),
                "txt",
                root.join("zfin/in"),
                "occ",
                root.join("bank/ARH"),
            ),
            Flow::new(
                "ZFIN->BANK",
                root.join("zfin/out"),
                "ifm",
                root.join("bank/IN"),
                "ifm",
                root.join("zfin/arc"),
            ),
        ];
        let lock = InstanceLock::acquire(&root.join("run/test.lock")).unwrap();
        let opts = BatchOptions {
            min_file_age: Duration::ZERO,
            max_files_per_cycle: 0,
            on_existing: OnExisting::Overwrite,
        };
        Scheduler::new(flows, opts, 5, Duration::from_millis(10), EngineContext::new(lock, Shutdown::new()))
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, 12, 0, 0).single().unwrap()
    }

    #[test]
    fn bootstrap_creates_dirs_and_removes_partials() {
        let td = tempdir().unwrap();
        let s = scheduler_in(td.path());
        fs::create_dir_all(td.path().join("zfin/in")).unwrap();
        fs::write(td.path().join("zfin/in/.zfin_bridge.x1.part"), b"half").unwrap();

        s.bootstrap().unwrap();
        for dir in ["bank/OUT", "bank/IN", "bank/ARH", "zfin/in", "zfin/out", "zfin/arc"] {
            assert!(td.path().join(dir).is_dir(), "{dir} missing");
        }
        assert!(!td.path().join("zfin/in/.zfin_bridge.x1.part").exists());
    }

    #[test]
    fn cycle_runs_both_flows_then_retention_once_per_day() {
        let td = tempdir().unwrap();
        let mut s = scheduler_in(td.path());
        s.bootstrap().unwrap();
        fs::write(td.path().join("bank/OUT/a.txt"), b"a").unwrap();
        fs::write(td.path().join("zfin/out/b.ifm"), b"b").unwrap();
        fs::create_dir_all(td.path().join("bank/ARH/2024-01-01")).unwrap();

        let report = s.run_cycle_at(at(2024, 1, 10));
        assert!(report.is_clean());
        assert_eq!(report.flows.len(), 2);
        assert_eq!(report.delivered(), 2);
        assert!(td.path().join("zfin/in/a.occ").exists());
        assert!(td.path().join("bank/IN/b.ifm").exists());
        assert!(td.path().join("bank/ARH/2024-01-10/OUT/a.txt").exists());
        assert!(td.path().join("zfin/arc/2024-01-10/out/b.ifm").exists());
        assert!(!td.path().join("bank/ARH/2024-01-01").exists());
        assert_eq!(report.retention.map(|r| r.deleted.len()), Some(1));

        let again = s.run_cycle_at(at(2024, 1, 10));
        assert!(again.retention.is_none());
        assert_eq!(s.context().retention.last_run(), Some(at(2024, 1, 10).date_naive()));
    }

    #[test]
    fn shutdown_before_cycle_does_nothing() {
        let td = tempdir().unwrap();
        let mut s = scheduler_in(td.path());
        s.bootstrap().unwrap();
        fs::write(td.path().join("bank/OUT/a.txt"), b"a").unwrap();
        s.context().shutdown.request();

        let report = s.run_cycle_at(at(2024, 1, 10));
        assert!(report.flows.is_empty());
        assert!(report.retention.is_none());
        assert!(td.path().join("bank/OUT/a.txt").exists());
        s.run_forever();
    }

    #[test]
    fn flow_error_does_not_stop_other_flow() {
        let td = tempdir().unwrap();
        let mut s = scheduler_in(td.path());
        s.bootstrap().unwrap();
        fs::write(td.path().join("zfin/out/b.ifm"), b"b").unwrap();
        fs::write(td.path().join("bank/OUT/a.txt"), b"a").unwrap();
        // A plain file where the archive root should be breaks the first flow.
        fs::remove_dir_all(td.path().join("bank/ARH")).unwrap();
        fs::write(td.path().join("bank/ARH"), b"not a dir").unwrap();

        let report = s.run_cycle_at(at(2024, 1, 10));
        assert!(!report.is_clean());
        assert!(report.flows[0].outcome.is_err());
        assert!(report.flows[1].is_clean());
        assert!(td.path().join("bank/IN/b.ifm").exists());
        assert!(td.path().join("bank/OUT/a.txt").exists());
    }
}
