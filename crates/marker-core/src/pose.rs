//! Pose type definition

use std::ops::Mul;

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Pose (position and orientation)
///
/// Also used as a rigid transform: `a * b` applies `b` in the local frame of `a`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }

    /// Build from URDF-style xyz + fixed-axis roll/pitch/yaw (radians)
    pub fn from_xyz_rpy(xyz: [f32; 3], rpy: [f32; 3]) -> Self {
        Self {
            position: Vec3::from(xyz),
            orientation: Quat::from_euler(EulerRot::ZYX, rpy[2], rpy[1], rpy[0]),
        }
    }

    /// Compose `other` onto this pose in the local frame
    pub fn compose(&self, other: &Pose) -> Pose {
        Pose {
            position: self.position + self.orientation * other.position,
            orientation: (self.orientation * other.orientation).normalize(),
        }
    }

    pub fn inverse(&self) -> Pose {
        let inv = self.orientation.inverse();
        Pose {
            position: inv * -self.position,
            orientation: inv,
        }
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.orientation * point
    }

    /// Approximate equality used by tests and change detection
    pub fn abs_diff_eq(&self, other: &Pose, max_abs_diff: f32) -> bool {
        self.position.abs_diff_eq(other.position, max_abs_diff)
            && (self.orientation.abs_diff_eq(other.orientation, max_abs_diff)
                || self.orientation.abs_diff_eq(-other.orientation, max_abs_diff))
    }
}

impl Mul for Pose {
    type Output = Pose;

    fn mul(self, rhs: Pose) -> Pose {
        self.compose(&rhs)
    }
}

impl From<&urdf_rs::Pose> for Pose {
    fn from(urdf_pose: &urdf_rs::Pose) -> Self {
        Self::from_xyz_rpy(
            [
                urdf_pose.xyz.0[0] as f32,
                urdf_pose.xyz.0[1] as f32,
                urdf_pose.xyz.0[2] as f32,
            ],
            [
                urdf_pose.rpy.0[0] as f32,
                urdf_pose.rpy.0[1] as f32,
                urdf_pose.rpy.0[2] as f32,
            ],
        )
    }
}

/// A pose paired with the frame it is expressed in
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseStamped {
    pub frame_id: String,
    pub pose: Pose,
}

impl PoseStamped {
    pub fn new(frame_id: impl Into<String>, pose: Pose) -> Self {
        Self {
            frame_id: frame_id.into(),
            pose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_compose_applies_local_offset() {
        let base = Pose::new(Vec3::new(1.0, 0.0, 0.0), Quat::from_rotation_z(FRAC_PI_2));
        let delta = Pose::from_position(Vec3::new(1.0, 0.0, 0.0));

        let result = base * delta;
        assert!(result.position.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6));
    }

    #[test]
    fn test_inverse_roundtrip() {
        let pose = Pose::new(
            Vec3::new(0.3, -1.2, 2.0),
            Quat::from_euler(EulerRot::XYZ, 0.1, 0.2, 0.3),
        );
        let identity = pose * pose.inverse();
        assert!(identity.abs_diff_eq(&Pose::IDENTITY, 1e-5));
    }

    #[test]
    fn test_from_urdf_pose() {
        let urdf_pose = urdf_rs::Pose {
            xyz: urdf_rs::Vec3([1.0, 2.0, 3.0]),
            rpy: urdf_rs::Vec3([0.0, 0.0, FRAC_PI_2 as f64]),
        };

        let pose = Pose::from(&urdf_pose);
        assert_eq!(pose.position, Vec3::new(1.0, 2.0, 3.0));
        let x_axis = pose.orientation * Vec3::X;
        assert!(x_axis.abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn test_default_is_identity() {
        assert_eq!(Pose::default(), Pose::IDENTITY);
    }
}
