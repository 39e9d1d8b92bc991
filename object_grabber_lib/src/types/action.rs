//! Wire messages exchanged with the object grabber action service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{GoalOutcome, GoalState, GrabberGoal};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalRequest {
    pub goal_id: Uuid,
    pub goal: GrabberGoal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    pub goal_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalResult {
    pub goal_id: Uuid,
    pub state: GoalState,
    pub return_code: i32,
}

impl GoalResult {
    pub fn outcome(&self) -> GoalOutcome {
        GoalOutcome::new(self.state, self.return_code)
    }
}
