use glam::Vec3;

use super::Rotation;

/// A rigid transform: rotation plus translation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub rotation: Rotation,
    pub position: Vec3,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        rotation: Rotation::IDENTITY,
        position: Vec3::ZERO,
    };

    pub fn new(rotation: Rotation, position: Vec3) -> Self {
        Self { rotation, position }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            rotation: Rotation::IDENTITY,
            position,
        }
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            rotation,
            position: -(rotation * self.position),
        }
    }

    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation * p + self.position
    }

    /// Shortest-path interpolation, handled separately per component:
    /// linear for position, axis-angle slerp for rotation.
    pub fn lerp(from: &Pose, to: &Pose, t: f32) -> Pose {
        Pose {
            rotation: from.rotation.slerp(&to.rotation, t),
            position: from.position.lerp(to.position, t),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.rotation.is_finite() && self.position.is_finite()
    }
}

impl std::ops::Mul for Pose {
    type Output = Pose;

    fn mul(self, rhs: Pose) -> Pose {
        Pose {
            rotation: self.rotation * rhs.rotation,
            position: self.rotation * rhs.position + self.position,
        }
    }
}
