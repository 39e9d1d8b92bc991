use serde::{Deserialize, Serialize};
use std::fmt;

/// Return code reported when no result arrived before the goal deadline.
pub const TIMED_OUT_RETURN_CODE: i32 = -1;

/// Terminal state of a dispatched goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalState {
    Succeeded,
    Aborted,
    Rejected,
    Preempted,
    Recalled,
    Lost,
    /// Produced locally when the per-goal deadline expires
    TimedOut,
}

impl GoalState {
    pub fn is_success(&self) -> bool {
        matches!(self, GoalState::Succeeded)
    }
}

impl fmt::Display for GoalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GoalState::Succeeded => "SUCCEEDED",
            GoalState::Aborted => "ABORTED",
            GoalState::Rejected => "REJECTED",
            GoalState::Preempted => "PREEMPTED",
            GoalState::Recalled => "RECALLED",
            GoalState::Lost => "LOST",
            GoalState::TimedOut => "TIMED_OUT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalOutcome {
    pub state: GoalState,
    pub return_code: i32,
}

impl GoalOutcome {
    pub fn new(state: GoalState, return_code: i32) -> Self {
        Self { state, return_code }
    }

    pub fn timed_out() -> Self {
        Self::new(GoalState::TimedOut, TIMED_OUT_RETURN_CODE)
    }

    pub fn is_success(&self) -> bool {
        self.state.is_success()
    }
}

impl fmt::Display for GoalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (return code {})", self.state, self.return_code)
    }
}
