//! Periodic consistency audit job.
//!
//! Runs the consistency auditor on an interval as a background task: compute
//! the report, log the summary, record metrics, and — when `auto_fix` is
//! enabled — repair the fixable subset in the same cycle. This is the
//! polling wrapper for deployments that want convergence without an admin
//! clicking refresh; the backend offers no event subscription to react to
//! instead.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::time::interval;
use tracing::{debug, info, warn};

use anaokulu_store::Backend;

use crate::{ConsistencyAuditor, RedirectConfig};

/// Default interval between audit cycles (5 minutes).
const AUDIT_INTERVAL: Duration = Duration::from_secs(300);

/// Background job that periodically audits and optionally repairs.
#[derive(bon::Builder)]
#[builder(on(_, required))]
pub struct AuditJob<B: Backend + Send + Sync + 'static> {
    /// The shared store backend.
    store: Arc<B>,
    /// Redirect targets for any repair-created accounts.
    redirects: RedirectConfig,
    /// Audit interval.
    #[builder(default = AUDIT_INTERVAL)]
    interval: Duration,
    /// Whether to run the auto-fix pass after each report.
    #[builder(default)]
    auto_fix: bool,
}

impl<B: Backend + Send + Sync + 'static> AuditJob<B> {
    /// Runs a single audit cycle.
    async fn run_cycle(&self) {
        let cycle_start = Instant::now();
        let auditor = ConsistencyAuditor::new(self.store.clone(), self.redirects.clone());

        let report = match auditor.report().await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Audit cycle failed to load collections");
                record_job_run("failure");
                record_job_duration(cycle_start.elapsed().as_secs_f64());
                return;
            },
        };

        if report.is_clean() {
            debug!("Audit cycle completed (no inconsistencies)");
        } else {
            info!(
                high = report.high,
                medium = report.medium,
                low = report.low,
                fixable = report.fixable,
                "Audit cycle found inconsistencies"
            );
        }

        record_job_items(report.inconsistencies.len() as u64);

        if self.auto_fix && report.fixable > 0 {
            match auditor.fix_all().await {
                Ok(fix) => info!(fixed = fix.fixed, failed = fix.failed, "Auto-fix pass applied"),
                Err(e) => warn!(error = %e, "Auto-fix pass failed"),
            }
        }

        record_job_run("success");
        record_job_duration(cycle_start.elapsed().as_secs_f64());
    }

    /// Starts the audit background task.
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.interval);

            info!(interval_secs = self.interval.as_secs(), auto_fix = self.auto_fix, "Audit job started");

            loop {
                ticker.tick().await;
                self.run_cycle().await;
            }
        })
    }
}

/// Records one job run with its outcome label.
fn record_job_run(outcome: &'static str) {
    metrics::counter!("anaokulu_audit_runs_total", "outcome" => outcome).increment(1);
}

/// Records the cycle duration in seconds.
fn record_job_duration(seconds: f64) {
    metrics::histogram!("anaokulu_audit_duration_seconds").record(seconds);
}

/// Records the number of inconsistencies seen this cycle.
fn record_job_items(count: u64) {
    metrics::counter!("anaokulu_audit_inconsistencies_total").increment(count);
}
