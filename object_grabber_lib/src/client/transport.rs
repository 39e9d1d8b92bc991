use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::{CompletionSender, GrabberGoal, Result};

/// Link to the object grabber action service.
///
/// Implementations deliver exactly one outcome per accepted goal through the
/// `CompletionSender` handed to [`GoalTransport::send_goal`], from whatever
/// task or thread they receive results on.
#[async_trait]
pub trait GoalTransport: Send + Sync {
    /// Check whether the service is reachable, waiting at most `timeout`.
    async fn probe(&self, timeout: Duration) -> bool;

    /// Dispatch `goal` without waiting for it to finish.
    async fn send_goal(&self, goal_id: Uuid, goal: GrabberGoal, done: CompletionSender) -> Result<()>;

    /// Ask the service to stop working on `goal_id`. Best effort.
    async fn cancel_goal(&self, goal_id: Uuid) -> Result<()>;
}
