use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::{debug, info, warn};

use crate::{GoalOutcome, GoalState, GrabberError, Result};

/// Lifecycle of the goal currently tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    /// Nothing dispatched yet
    Idle,
    Pending,
    Complete,
}

/// How a wait on the tracker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    Complete(GoalOutcome),
    DeadlineExpired,
}

#[derive(Debug)]
struct TrackerRecord {
    phase: TrackerPhase,
    generation: u64,
    last_outcome: Option<GoalOutcome>,
}

#[derive(Debug)]
struct Shared {
    record: Mutex<TrackerRecord>,
    notify: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TrackerRecord> {
        // The record holds plain values; a poisoned lock still has a consistent one.
        self.record.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Completion gate for the single goal in flight.
///
/// `reset()` moves the tracker to `Pending` and hands out the sender the
/// transport uses to report the outcome. Only the sender from the latest
/// reset can complete the tracker, and only once.
#[derive(Debug, Clone)]
pub struct CompletionTracker {
    shared: Arc<Shared>,
}

impl Default for CompletionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                record: Mutex::new(TrackerRecord {
                    phase: TrackerPhase::Idle,
                    generation: 0,
                    last_outcome: None,
                }),
                notify: Notify::new(),
            }),
        }
    }

    /// Clear the completion flag ahead of a dispatch.
    pub fn reset(&self) -> CompletionSender {
        let mut record = self.shared.lock();
        record.generation += 1;
        record.phase = TrackerPhase::Pending;
        record.last_outcome = None;

        CompletionSender {
            shared: Arc::clone(&self.shared),
            generation: record.generation,
        }
    }

    pub fn phase(&self) -> TrackerPhase {
        self.shared.lock().phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase() == TrackerPhase::Complete
    }

    pub fn last_outcome(&self) -> Option<GoalOutcome> {
        self.shared.lock().last_outcome
    }

    /// Wait until the pending goal completes.
    ///
    /// Logs `waiting on <label>...` every `poll_interval`. Returns
    /// `DeadlineExpired` once `deadline` passes without an outcome, and
    /// `GrabberError::Shutdown` as soon as `shutdown` flips to true.
    pub async fn wait(
        &self,
        label: &str,
        poll_interval: Duration,
        deadline: Option<Duration>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<WaitResult> {
        let expiry = deadline.map(|d| tokio::time::Instant::now() + d);
        let mut ticker = tokio::time::interval(poll_interval);
        // first tick fires immediately
        ticker.tick().await;
        let mut shutdown_open = true;

        loop {
            // Register interest before checking so a completion between the
            // check and the select is not missed.
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(outcome) = self.completed_outcome() {
                return Ok(WaitResult::Complete(outcome));
            }
            if *shutdown.borrow() {
                return Err(GrabberError::Shutdown(format!("waiting on {}", label)));
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = ticker.tick() => {
                    info!("waiting on {}...", label);
                }
                changed = shutdown.changed(), if shutdown_open => {
                    if changed.is_err() {
                        debug!("shutdown channel closed while waiting on {}", label);
                        shutdown_open = false;
                    }
                }
                _ = sleep_until(expiry) => {
                    return Ok(WaitResult::DeadlineExpired);
                }
            }
        }
    }

    /// Close out a pending goal that ran past its deadline. Any result the
    /// service sends afterwards is rejected as a duplicate.
    pub(crate) fn expire(&self) -> GoalOutcome {
        let mut record = self.shared.lock();
        if record.phase == TrackerPhase::Pending {
            record.phase = TrackerPhase::Complete;
            record.last_outcome = Some(GoalOutcome::timed_out());
        }
        record.last_outcome.unwrap_or_else(GoalOutcome::timed_out)
    }

    fn completed_outcome(&self) -> Option<GoalOutcome> {
        let record = self.shared.lock();
        match record.phase {
            TrackerPhase::Complete => record.last_outcome,
            _ => None,
        }
    }
}

async fn sleep_until(expiry: Option<tokio::time::Instant>) {
    match expiry {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// One-shot completion handle for a single dispatched goal.
#[derive(Debug)]
pub struct CompletionSender {
    shared: Arc<Shared>,
    generation: u64,
}

impl CompletionSender {
    /// Record the goal's terminal state and return code.
    pub fn on_result(&self, state: GoalState, return_code: i32) -> Result<()> {
        let outcome = GoalOutcome::new(state, return_code);
        {
            let mut record = self.shared.lock();
            if record.generation != self.generation {
                warn!("Dropping outcome {} for a superseded goal", outcome);
                return Err(GrabberError::StaleOutcome);
            }
            if record.phase == TrackerPhase::Complete {
                warn!("Dropping duplicate outcome {}", outcome);
                return Err(GrabberError::DuplicateOutcome);
            }
            record.phase = TrackerPhase::Complete;
            record.last_outcome = Some(outcome);
        }

        info!("server responded with state [{}]", state);
        info!("got result output = {}", return_code);
        self.shared.notify.notify_waiters();
        Ok(())
    }
}
