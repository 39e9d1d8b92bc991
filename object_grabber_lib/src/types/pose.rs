use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion};
use serde::{Deserialize, Serialize};

/// Frame every demo pose is expressed in. Must be connected to the
/// manipulation service's root frame.
pub const SYSTEM_REF_FRAME: &str = "system_ref_frame";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Orientation quaternion in (x, y, z, w) order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Orientation {
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }

    pub fn norm(&self) -> f64 {
        Quaternion::new(self.w, self.x, self.y, self.z).norm()
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::identity()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameHeader {
    /// Named reference frame, resolved by the service, never locally
    pub frame_id: String,
    /// Milliseconds since Unix epoch
    pub stamp_ms: u64,
}

/// Object pose expressed relative to a named reference frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseStamped {
    pub header: FrameHeader,
    pub position: Point,
    pub orientation: Orientation,
}

impl PoseStamped {
    /// Pose stamped with the current time.
    pub fn new(frame_id: impl Into<String>, position: Point, orientation: Orientation) -> Self {
        Self {
            header: FrameHeader {
                frame_id: frame_id.into(),
                stamp_ms: chrono::Utc::now().timestamp_millis().max(0) as u64,
            },
            position,
            orientation,
        }
    }

    /// Copy of this pose with x and y replaced; z, orientation, frame and
    /// stamp are kept. Used to derive a drop-off pose from a pick-up pose.
    pub fn with_xy(&self, x: f64, y: f64) -> Self {
        let mut pose = self.clone();
        pose.position.x = x;
        pose.position.y = y;
        pose
    }

    pub fn is_finite(&self) -> bool {
        let p = &self.position;
        let q = &self.orientation;
        [p.x, p.y, p.z, q.x, q.y, q.z, q.w]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Rigid transform of the object frame relative to `header.frame_id`.
    pub fn isometry(&self) -> Isometry3<f64> {
        let q = &self.orientation;
        let rotation = UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z));
        let p = &self.position;
        Isometry3::from_parts(Translation3::new(p.x, p.y, p.z), rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn test_with_xy_keeps_height_and_orientation() {
        let pickup = pickup();
        let dropoff = pickup.with_xy(0.7, 0.0);

        assert_eq!(dropoff.position.x, 0.7);
        assert_eq!(dropoff.position.y, 0.0);
        assert_eq!(dropoff.position.z, 0.84);
        assert_eq!(dropoff.orientation, Orientation::identity());
        assert_eq!(dropoff.header, pickup.header);
    }

    #[test]
    fn test_isometry_translation() {
        let iso = pickup().isometry();
        assert!((iso.translation.vector.x - 0.5).abs() < 1e-12);
        assert!((iso.translation.vector.y + 0.35).abs() < 1e-12);
        assert!(iso.rotation.angle().abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_pose_detected() {
        let mut pose = pickup();
        assert!(pose.is_finite());
        pose.position.z = f64::NAN;
        assert!(!pose.is_finite());
    }
}
