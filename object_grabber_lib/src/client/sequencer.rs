use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    ActionCode, ClientConfig, CompletionTracker, ConnectionManager, ExecutionConfig,
    FailurePolicy, GoalEncoder, GoalOutcome, GoalTransport, GrabberError, GrabberGoal, ObjectId,
    PoseStamped, Result, WaitResult,
};

/// One goal of the pick-and-place sequence, encoded ahead of dispatch.
#[derive(Debug, Clone)]
pub struct SequenceStep {
    pub label: &'static str,
    pub goal: GrabberGoal,
}

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub label: &'static str,
    pub action: ActionCode,
    pub goal_id: Uuid,
    pub outcome: GoalOutcome,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct SequenceReport {
    pub connect_attempts: u32,
    pub steps: Vec<StepRecord>,
}

impl SequenceReport {
    pub fn all_succeeded(&self) -> bool {
        self.steps.iter().all(|step| step.outcome.is_success())
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|step| !step.outcome.is_success())
    }
}

/// Drives the action service through waiting pose → grab → dropoff, one goal
/// at a time. A goal is only dispatched after the previous one's outcome has
/// been recorded.
pub struct Sequencer<T> {
    transport: T,
    connection: ConnectionManager,
    encoder: GoalEncoder,
    tracker: CompletionTracker,
    execution: ExecutionConfig,
    object_id: ObjectId,
}

impl<T: GoalTransport> Sequencer<T> {
    pub fn new(transport: T, config: &ClientConfig) -> Self {
        Self {
            transport,
            connection: ConnectionManager::new(config.connection.clone()),
            encoder: GoalEncoder::new(config.task.strategy),
            tracker: CompletionTracker::new(),
            execution: config.execution.clone(),
            object_id: config.task.object_id,
        }
    }

    pub fn tracker(&self) -> &CompletionTracker {
        &self.tracker
    }

    /// Encode every step up front so a bad goal stops the run before the
    /// arm moves at all.
    pub fn plan(&self, pickup: &PoseStamped, dropoff: &PoseStamped) -> Result<Vec<SequenceStep>> {
        let mut steps = vec![
            SequenceStep {
                label: "move",
                goal: self.encoder.move_to_waiting_pose()?,
            },
            SequenceStep {
                label: "grab",
                goal: self.encoder.grab(self.object_id, pickup)?,
            },
            SequenceStep {
                label: "dropoff",
                goal: self.encoder.dropoff(self.object_id, dropoff)?,
            },
        ];

        if self.execution.return_to_waiting {
            steps.push(SequenceStep {
                label: "return",
                goal: self.encoder.move_to_waiting_pose()?,
            });
        }

        Ok(steps)
    }

    pub async fn run(
        &mut self,
        pickup: &PoseStamped,
        dropoff: &PoseStamped,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<SequenceReport> {
        let steps = self.plan(pickup, dropoff).map_err(|e| {
            error!("Refusing to start sequence: {}", e);
            e
        })?;

        let connect_attempts = self
            .connection
            .ensure_connected(&self.transport, shutdown)
            .await?;

        let mut report = SequenceReport {
            connect_attempts,
            steps: Vec::with_capacity(steps.len()),
        };

        for step in steps {
            let record = self.execute_step(step, shutdown).await?;
            let failed = !record.outcome.is_success();
            let outcome = record.outcome;
            let label = record.label;
            report.steps.push(record);

            if failed {
                match self.execution.failure_policy {
                    FailurePolicy::ContinueOnFailure => {
                        warn!("{} ended with {}; continuing with next step", label, outcome);
                    }
                    FailurePolicy::AbortOnFailure => {
                        error!("{} ended with {}; aborting sequence", label, outcome);
                        return Err(GrabberError::StepFailed {
                            step: label.to_string(),
                            outcome,
                        });
                    }
                }
            }
        }

        info!(
            "Sequence finished: {}/{} steps succeeded",
            report.steps.len() - report.failed_steps().count(),
            report.steps.len()
        );
        Ok(report)
    }

    async fn execute_step(
        &mut self,
        step: SequenceStep,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<StepRecord> {
        let SequenceStep { label, goal } = step;
        let action = goal.action_code;
        let goal_id = Uuid::new_v4();

        let done = self.tracker.reset();
        info!("sending {} goal {} ({})", action, goal_id, label);
        let started = Instant::now();
        self.transport.send_goal(goal_id, goal, done).await?;

        let waited = self
            .tracker
            .wait(
                label,
                self.execution.poll_interval(),
                self.execution.goal_timeout(),
                shutdown,
            )
            .await;

        let outcome = match waited {
            Ok(WaitResult::Complete(outcome)) => outcome,
            Ok(WaitResult::DeadlineExpired) => {
                warn!(
                    "{} goal {} got no result within {:?}; cancelling",
                    label,
                    goal_id,
                    self.execution.goal_timeout().unwrap_or_default()
                );
                self.cancel(goal_id).await;
                self.tracker.expire()
            }
            Err(e) => {
                self.cancel(goal_id).await;
                return Err(e);
            }
        };

        let elapsed = started.elapsed();
        info!("{} finished with {} after {:.2}s", label, outcome, elapsed.as_secs_f64());

        Ok(StepRecord {
            label,
            action,
            goal_id,
            outcome,
            elapsed,
        })
    }

    async fn cancel(&self, goal_id: Uuid) {
        if let Err(e) = self.transport.cancel_goal(goal_id).await {
            warn!("Failed to cancel goal {}: {}", goal_id, e);
        }
    }
}
