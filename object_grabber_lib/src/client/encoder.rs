use crate::{
    ActionCode, ApproachStrategy, DepartStrategy, GrabberError, GrabberGoal, GraspStrategy,
    ObjectId, PoseStamped, Result, StrategyOverrides,
};

pub const DEFAULT_SPEED_FACTOR: f64 = 1.0;

/// Builds goals for the action service, filling unset strategies from its
/// defaults and refusing requests the service could not act on.
#[derive(Debug, Clone)]
pub struct GoalEncoder {
    defaults: StrategyOverrides,
}

impl Default for GoalEncoder {
    fn default() -> Self {
        Self::new(StrategyOverrides::default())
    }
}

impl GoalEncoder {
    /// `defaults` apply to every goal; per-call overrides win over them.
    pub fn new(defaults: StrategyOverrides) -> Self {
        Self { defaults }
    }

    pub fn encode(
        &self,
        action: ActionCode,
        object_id: Option<ObjectId>,
        pose: Option<&PoseStamped>,
        overrides: Option<&StrategyOverrides>,
    ) -> Result<GrabberGoal> {
        match (action.requires_object(), object_id, pose) {
            (true, Some(_), Some(_)) | (false, None, None) => {}
            (true, _, _) => {
                return Err(GrabberError::InvalidGoal(format!(
                    "{} needs both an object id and a pose",
                    action
                )))
            }
            (false, _, _) => {
                return Err(GrabberError::InvalidGoal(format!(
                    "{} takes no object id or pose",
                    action
                )))
            }
        }

        if let Some(pose) = pose {
            validate_pose(pose)?;
        }

        let overrides = overrides.copied().unwrap_or_default();
        let speed_factor = overrides
            .speed_factor
            .or(self.defaults.speed_factor)
            .unwrap_or(DEFAULT_SPEED_FACTOR);
        if !speed_factor.is_finite() || speed_factor <= 0.0 {
            return Err(GrabberError::InvalidGoal(format!(
                "speed factor must be positive, got {}",
                speed_factor
            )));
        }

        Ok(GrabberGoal {
            action_code: action,
            object_id,
            object_frame: pose.cloned(),
            grasp_option: overrides
                .grasp
                .or(self.defaults.grasp)
                .unwrap_or(GraspStrategy::DEFAULT),
            approach_strategy: overrides
                .approach
                .or(self.defaults.approach)
                .unwrap_or(ApproachStrategy::DEFAULT),
            depart_strategy: overrides
                .depart
                .or(self.defaults.depart)
                .unwrap_or(DepartStrategy::DEFAULT),
            speed_factor,
        })
    }

    pub fn move_to_waiting_pose(&self) -> Result<GrabberGoal> {
        self.encode(ActionCode::MoveToWaitingPose, None, None, None)
    }

    pub fn grab(&self, object_id: ObjectId, pickup: &PoseStamped) -> Result<GrabberGoal> {
        self.encode(ActionCode::GrabObject, Some(object_id), Some(pickup), None)
    }

    pub fn dropoff(&self, object_id: ObjectId, dropoff: &PoseStamped) -> Result<GrabberGoal> {
        self.encode(ActionCode::DropoffObject, Some(object_id), Some(dropoff), None)
    }
}

fn validate_pose(pose: &PoseStamped) -> Result<()> {
    if pose.header.frame_id.trim().is_empty() {
        return Err(GrabberError::InvalidGoal("pose has no frame id".to_string()));
    }
    if !pose.is_finite() {
        return Err(GrabberError::InvalidGoal(
            "pose contains non-finite values".to_string(),
        ));
    }
    if pose.orientation.norm() < 1e-9 {
        return Err(GrabberError::InvalidGoal(
            "pose orientation is a zero quaternion".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Orientation, Point, SYSTEM_REF_FRAME};

    fn pickup() -> PoseStamped {
        PoseStamped::new(
            SYSTEM_REF_FRAME,
            Point {
                x: 0.5,
                y: -0.35,
                z: 0.84,
            },
            Orientation::identity(),
        )
    }

    #[test]
    fn test_waiting_pose_goal_has_no_object() {
        let goal = GoalEncoder::default().move_to_waiting_pose().unwrap();

        assert_eq!(goal.action_code, ActionCode::MoveToWaitingPose);
        assert_eq!(goal.object_id, None);
        assert_eq!(goal.object_frame, None);
    }

    #[test]
    fn test_grab_uses_default_strategy() {
        let pose = pickup();
        let goal = GoalEncoder::default()
            .grab(ObjectId::COKE_CAN_UPRIGHT, &pose)
            .unwrap();

        assert_eq!(goal.action_code, ActionCode::GrabObject);
        assert_eq!(goal.object_id, Some(ObjectId::COKE_CAN_UPRIGHT));
        assert_eq!(goal.grasp_option, GraspStrategy::DEFAULT);
        assert_eq!(goal.approach_strategy, ApproachStrategy::DEFAULT);
        assert_eq!(goal.depart_strategy, DepartStrategy::DEFAULT);
        assert_eq!(goal.speed_factor, 1.0);

        let frame = goal.object_frame.unwrap();
        assert_eq!(frame.header.frame_id, "system_ref_frame");
        assert_eq!(frame.position, Point { x: 0.5, y: -0.35, z: 0.84 });
        assert_eq!(frame.orientation, Orientation::identity());
    }

    #[test]
    fn test_dropoff_pose_derived_from_pickup() {
        let dropoff = pickup().with_xy(0.7, 0.0);
        let goal = GoalEncoder::default()
            .dropoff(ObjectId::COKE_CAN_UPRIGHT, &dropoff)
            .unwrap();

        let frame = goal.object_frame.unwrap();
        assert_eq!(goal.action_code, ActionCode::DropoffObject);
        assert_eq!(frame.position, Point { x: 0.7, y: 0.0, z: 0.84 });
        assert_eq!(frame.orientation, Orientation::identity());
        assert_eq!(frame.header.frame_id, SYSTEM_REF_FRAME);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let encoder = GoalEncoder::default();
        let pose = pickup();
        let overrides = StrategyOverrides {
            grasp: Some(GraspStrategy::GRASP_FROM_SIDE),
            ..Default::default()
        };

        let a = encoder
            .encode(ActionCode::GrabObject, Some(ObjectId::TOY_BLOCK), Some(&pose), Some(&overrides))
            .unwrap();
        let b = encoder
            .encode(ActionCode::GrabObject, Some(ObjectId::TOY_BLOCK), Some(&pose), Some(&overrides))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_overrides_win_over_defaults() {
        let encoder = GoalEncoder::new(StrategyOverrides {
            depart: Some(DepartStrategy::DEPART_UPWARD),
            speed_factor: Some(0.5),
            ..Default::default()
        });
        let overrides = StrategyOverrides {
            speed_factor: Some(0.25),
            approach: Some(ApproachStrategy::APPROACH_FROM_ABOVE),
            ..Default::default()
        };

        let goal = encoder
            .encode(ActionCode::GrabObject, Some(ObjectId::TOY_BLOCK), Some(&pickup()), Some(&overrides))
            .unwrap();

        assert_eq!(goal.speed_factor, 0.25);
        assert_eq!(goal.approach_strategy, ApproachStrategy::APPROACH_FROM_ABOVE);
        assert_eq!(goal.depart_strategy, DepartStrategy::DEPART_UPWARD);
        assert_eq!(goal.grasp_option, GraspStrategy::DEFAULT);
    }

    #[test]
    fn test_grab_without_pose_is_invalid() {
        let err = GoalEncoder::default()
            .encode(ActionCode::GrabObject, Some(ObjectId::COKE_CAN_UPRIGHT), None, None)
            .unwrap_err();
        assert!(matches!(err, GrabberError::InvalidGoal(_)));

        let err = GoalEncoder::default()
            .encode(ActionCode::DropoffObject, None, Some(&pickup()), None)
            .unwrap_err();
        assert!(matches!(err, GrabberError::InvalidGoal(_)));
    }

    #[test]
    fn test_waiting_pose_with_object_is_invalid() {
        let err = GoalEncoder::default()
            .encode(
                ActionCode::MoveToWaitingPose,
                Some(ObjectId::COKE_CAN_UPRIGHT),
                Some(&pickup()),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, GrabberError::InvalidGoal(_)));
    }

    #[test]
    fn test_degenerate_pose_is_invalid() {
        let encoder = GoalEncoder::default();

        let mut zero_quat = pickup();
        zero_quat.orientation.w = 0.0;
        assert!(encoder.grab(ObjectId::COKE_CAN_UPRIGHT, &zero_quat).is_err());

        let mut no_frame = pickup();
        no_frame.header.frame_id = String::new();
        assert!(encoder.grab(ObjectId::COKE_CAN_UPRIGHT, &no_frame).is_err());

        let bad_speed = StrategyOverrides {
            speed_factor: Some(0.0),
            ..Default::default()
        };
        assert!(encoder.encode(ActionCode::MoveToWaitingPose, None, None, Some(&bad_speed)).is_err());
    }
}
