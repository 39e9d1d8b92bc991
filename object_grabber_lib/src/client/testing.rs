//! In-memory transport that replays scripted probe results and outcomes.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::{CompletionSender, GoalState, GoalTransport, GrabberError, GrabberGoal, Result};

#[derive(Debug, Clone, Copy)]
pub enum ScriptedReply {
    After {
        delay: Duration,
        state: GoalState,
        return_code: i32,
    },
    /// The service accepts the goal and never answers
    Silent,
}

#[derive(Debug, Clone)]
pub struct DispatchRecord {
    pub goal_id: Uuid,
    pub goal: GrabberGoal,
    pub probes_before: u32,
}

#[derive(Default)]
struct Inner {
    probe_failures: AtomicU32,
    probe_count: AtomicU32,
    replies: Mutex<VecDeque<ScriptedReply>>,
    dispatched: Mutex<Vec<DispatchRecord>>,
    cancelled: Mutex<Vec<Uuid>>,
    silent: Mutex<Vec<CompletionSender>>,
    in_flight: AtomicBool,
    overlap: AtomicBool,
    fail_send: AtomicBool,
}

#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Inner>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_probe_failures(self, failures: u32) -> Self {
        self.inner.probe_failures.store(failures, Ordering::SeqCst);
        self
    }

    /// Replies are consumed one per goal; goals past the script succeed.
    pub fn with_replies(self, replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        self.inner.replies.lock().unwrap().extend(replies);
        self
    }

    pub fn with_failing_send(self) -> Self {
        self.inner.fail_send.store(true, Ordering::SeqCst);
        self
    }

    pub fn probe_count(&self) -> u32 {
        self.inner.probe_count.load(Ordering::SeqCst)
    }

    pub fn dispatched(&self) -> Vec<DispatchRecord> {
        self.inner.dispatched.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> Vec<Uuid> {
        self.inner.cancelled.lock().unwrap().clone()
    }

    /// True if a goal was sent while an earlier one was still running.
    pub fn overlap_detected(&self) -> bool {
        self.inner.overlap.load(Ordering::SeqCst)
    }
}

pub fn reply(state: GoalState, return_code: i32) -> ScriptedReply {
    ScriptedReply::After {
        delay: Duration::from_millis(10),
        state,
        return_code,
    }
}

#[async_trait]
impl GoalTransport for ScriptedTransport {
    async fn probe(&self, _timeout: Duration) -> bool {
        self.inner.probe_count.fetch_add(1, Ordering::SeqCst);
        let remaining = self.inner.probe_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.inner.probe_failures.store(remaining - 1, Ordering::SeqCst);
            return false;
        }
        true
    }

    async fn send_goal(&self, goal_id: Uuid, goal: GrabberGoal, done: CompletionSender) -> Result<()> {
        if self.inner.fail_send.load(Ordering::SeqCst) {
            return Err(GrabberError::Transport("scripted send failure".to_string()));
        }

        self.inner.dispatched.lock().unwrap().push(DispatchRecord {
            goal_id,
            goal,
            probes_before: self.probe_count(),
        });
        if self.inner.in_flight.swap(true, Ordering::SeqCst) {
            self.inner.overlap.store(true, Ordering::SeqCst);
        }

        let next = self
            .inner
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| reply(GoalState::Succeeded, 0));

        match next {
            ScriptedReply::After {
                delay,
                state,
                return_code,
            } => {
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    inner.in_flight.store(false, Ordering::SeqCst);
                    let _ = done.on_result(state, return_code);
                });
            }
            ScriptedReply::Silent => {
                self.inner.silent.lock().unwrap().push(done);
            }
        }
        Ok(())
    }

    async fn cancel_goal(&self, goal_id: Uuid) -> Result<()> {
        self.inner.cancelled.lock().unwrap().push(goal_id);
        self.inner.in_flight.store(false, Ordering::SeqCst);
        Ok(())
    }
}
