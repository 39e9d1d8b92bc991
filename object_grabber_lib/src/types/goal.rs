use serde::{Deserialize, Serialize};
use std::fmt;

use crate::PoseStamped;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionCode {
    MoveToWaitingPose,
    GrabObject,
    DropoffObject,
}

impl ActionCode {
    /// Grab and dropoff act on an object and need both an id and a pose.
    pub fn requires_object(&self) -> bool {
        matches!(self, ActionCode::GrabObject | ActionCode::DropoffObject)
    }
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionCode::MoveToWaitingPose => "move-to-waiting-pose",
            ActionCode::GrabObject => "grab-object",
            ActionCode::DropoffObject => "dropoff-object",
        };
        f.write_str(name)
    }
}

/// Object identifier from the manipulation properties catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub i32);

impl ObjectId {
    pub const TOY_BLOCK: ObjectId = ObjectId(1);
    pub const COKE_CAN_UPRIGHT: ObjectId = ObjectId(2);
    pub const GAZEBO_BEER: ObjectId = ObjectId(3);
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraspStrategy(pub i32);

impl GraspStrategy {
    /// Let the service pick the grasp for the gripper/object pair
    pub const DEFAULT: GraspStrategy = GraspStrategy(0);
    pub const GRASP_FROM_ABOVE: GraspStrategy = GraspStrategy(1);
    pub const GRASP_FROM_SIDE: GraspStrategy = GraspStrategy(2);
}

impl Default for GraspStrategy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApproachStrategy(pub i32);

impl ApproachStrategy {
    pub const DEFAULT: ApproachStrategy = ApproachStrategy(0);
    pub const APPROACH_FROM_ABOVE: ApproachStrategy = ApproachStrategy(1);
}

impl Default for ApproachStrategy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartStrategy(pub i32);

impl DepartStrategy {
    pub const DEFAULT: DepartStrategy = DepartStrategy(0);
    pub const DEPART_UPWARD: DepartStrategy = DepartStrategy(1);
}

impl Default for DepartStrategy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Per-goal strategy selection. Unset fields fall back to the encoder defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyOverrides {
    #[serde(default)]
    pub grasp: Option<GraspStrategy>,
    #[serde(default)]
    pub approach: Option<ApproachStrategy>,
    #[serde(default)]
    pub depart: Option<DepartStrategy>,
    #[serde(default)]
    pub speed_factor: Option<f64>,
}

/// Goal request understood by the object grabber action service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrabberGoal {
    pub action_code: ActionCode,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub object_id: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub object_frame: Option<PoseStamped>,
    pub grasp_option: GraspStrategy,
    pub approach_strategy: ApproachStrategy,
    pub depart_strategy: DepartStrategy,
    pub speed_factor: f64,
}
