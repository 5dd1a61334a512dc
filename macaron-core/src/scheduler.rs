//! Periodic randomization.
//!
//! A [`RandomizationScheduler`] owns at most one timer task. Each firing
//! applies fresh addresses to every eligible interface through the shared
//! orchestrator, so a firing and a manual request on the same interface are
//! serialized by the orchestrator's per-interface locks, not here.
//!
//! The first firing happens one full interval after [`start`], never
//! immediately. [`stop`] prevents future firings; a firing already running
//! is allowed to finish.
//!
//! [`start`]: RandomizationScheduler::start
//! [`stop`]: RandomizationScheduler::stop

use crate::errors::MacaronError;
use crate::orchestrator::{OperationOutcome, RandomizationOrchestrator};
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub const MIN_INTERVAL_MINUTES: u32 = 1;
pub const MAX_INTERVAL_MINUTES: u32 = 1440;

/// Result of a [`RandomizationScheduler::start`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A timer was already active; nothing changed.
    AlreadyRunning,
}

/// What one firing did.
#[derive(Debug, Clone)]
pub struct FiringReport {
    pub fired_at: DateTime<Utc>,
    pub outcomes: Vec<OperationOutcome>,
}

impl FiringReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

struct ActiveTimer {
    interval_minutes: u32,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Bounded log of recent firings, shared with the timer task.
#[derive(Clone)]
struct FiringLog {
    entries: Arc<Mutex<VecDeque<FiringReport>>>,
    limit: usize,
}

impl FiringLog {
    fn new(limit: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(limit))),
            limit,
        }
    }

    fn push(&self, report: FiringReport) {
        if self.limit == 0 {
            return;
        }
        let mut entries = self.lock();
        while entries.len() >= self.limit {
            entries.pop_front();
        }
        entries.push_back(report);
    }

    fn snapshot(&self) -> Vec<FiringReport> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<FiringReport>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Check an interval without starting anything.
pub fn validate_interval(interval_minutes: u32) -> Result<Duration> {
    if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&interval_minutes) {
        return Err(MacaronError::InvalidInterval(interval_minutes));
    }
    Ok(Duration::from_secs(u64::from(interval_minutes) * 60))
}

/// Drives `randomize_eligible` on a fixed period.
pub struct RandomizationScheduler {
    orchestrator: RandomizationOrchestrator,
    active: Mutex<Option<ActiveTimer>>,
    log: FiringLog,
}

impl RandomizationScheduler {
    pub fn new(orchestrator: RandomizationOrchestrator) -> Self {
        let limit = orchestrator.config().history_limit;
        Self {
            orchestrator,
            active: Mutex::new(None),
            log: FiringLog::new(limit),
        }
    }

    /// Start firing every `interval_minutes`.
    ///
    /// Must be called from within a tokio runtime. Out-of-range intervals
    /// are rejected, not clamped.
    pub fn start(&self, interval_minutes: u32) -> Result<StartOutcome> {
        let period = validate_interval(interval_minutes)?;

        let mut active = self.active();
        if let Some(timer) = active.as_ref() {
            if !timer.handle.is_finished() {
                tracing::debug!(
                    interval_minutes = timer.interval_minutes,
                    "scheduler already running"
                );
                return Ok(StartOutcome::AlreadyRunning);
            }
        }

        let runtime = Handle::try_current().map_err(|_| MacaronError::NoRuntime)?;
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = runtime.spawn(run_timer(
            self.orchestrator.clone(),
            period,
            shutdown_rx,
            self.log.clone(),
        ));

        *active = Some(ActiveTimer {
            interval_minutes,
            shutdown,
            handle,
        });
        tracing::info!(interval_minutes, "scheduler started");
        Ok(StartOutcome::Started)
    }

    /// Cancel future firings. Returns whether a timer was running.
    pub fn stop(&self) -> bool {
        match self.active().take() {
            Some(timer) => {
                // Dropping the sender also wakes the task; the send is explicit
                let _ = timer.shutdown.send(true);
                tracing::info!("scheduler stopped");
                !timer.handle.is_finished()
            }
            None => false,
        }
    }

    /// Cancel future firings and wait for a firing already under way.
    ///
    /// Use this before the runtime goes away: dropping the runtime while a
    /// firing runs would cut its command sequences short.
    pub async fn shutdown(&self) -> bool {
        let Some(timer) = self.active().take() else {
            return false;
        };
        let _ = timer.shutdown.send(true);
        let was_running = !timer.handle.is_finished();
        if let Err(err) = timer.handle.await {
            tracing::warn!(error = %err, "scheduler task ended abnormally");
        }
        tracing::info!("scheduler shut down");
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.active()
            .as_ref()
            .map(|timer| !timer.handle.is_finished())
            .unwrap_or(false)
    }

    /// Interval of the active timer.
    pub fn interval_minutes(&self) -> Option<u32> {
        self.active().as_ref().map(|timer| timer.interval_minutes)
    }

    /// Recent firings, oldest first.
    pub fn reports(&self) -> Vec<FiringReport> {
        self.log.snapshot()
    }

    fn active(&self) -> MutexGuard<'_, Option<ActiveTimer>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for RandomizationScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_timer(
    orchestrator: RandomizationOrchestrator,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    log: FiringLog,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        // Runs outside the select so stop() cannot cut a firing short
        if let Some(report) = fire(&orchestrator).await {
            log.push(report);
        }
    }
    tracing::debug!("scheduler task exited");
}

async fn fire(orchestrator: &RandomizationOrchestrator) -> Option<FiringReport> {
    let eligible = orchestrator.registry().all_eligible();
    if eligible.is_empty() {
        tracing::debug!("scheduled firing found no eligible interfaces");
        return None;
    }

    let fired_at = Utc::now();
    let outcomes = orchestrator.apply_many(&eligible).await;
    let report = FiringReport { fired_at, outcomes };

    for outcome in report.outcomes.iter().filter(|o| !o.is_success()) {
        if let Err(err) = &outcome.result {
            tracing::warn!(
                interface = %outcome.interface,
                kind = %err.kind(),
                error = %err,
                "scheduled randomization failed"
            );
        }
    }
    tracing::info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "scheduled randomization finished"
    );
    Some(report)
}
