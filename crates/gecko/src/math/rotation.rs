use glam::{Mat3, Vec3};

/// Rotations smaller than this are treated as identity, so the axis is
/// never normalized from a zero-length vector.
pub const MIN_ROTATION_ANGLE: f32 = 1e-6;

/// Above this angle the axis is read from the matrix diagonal instead of
/// the skew part, which degenerates approaching pi.
const NEAR_PI_ANGLE: f32 = 3.0;

/// An orthonormal 3x3 rotation basis.
///
/// Every constructor re-orthonormalizes, so repeated composition cannot
/// accumulate shear or scale drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation(Mat3);

impl Rotation {
    pub const IDENTITY: Self = Self(Mat3::IDENTITY);

    pub fn from_matrix(matrix: Mat3) -> Self {
        Self(orthonormalize(matrix))
    }

    /// Rotation of `angle` radians about `axis`. Below the small-angle
    /// threshold this is the identity and the axis is not touched.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        if angle.abs() < MIN_ROTATION_ANGLE {
            return Self::IDENTITY;
        }
        let axis = match axis.try_normalize() {
            Some(axis) => axis,
            None => return Self::IDENTITY,
        };
        Self(Mat3::from_axis_angle(axis, angle))
    }

    /// Rotation from an axis-angle vector whose length is the angle.
    pub fn from_scaled_axis(v: Vec3) -> Self {
        let angle = v.length();
        if angle < MIN_ROTATION_ANGLE {
            return Self::IDENTITY;
        }
        Self(Mat3::from_axis_angle(v / angle, angle))
    }

    pub fn matrix(&self) -> Mat3 {
        self.0
    }

    pub fn inverse(&self) -> Self {
        Self(self.0.transpose())
    }

    pub fn transform(&self, v: Vec3) -> Vec3 {
        self.0 * v
    }

    pub fn orthonormalized(&self) -> Self {
        Self(orthonormalize(self.0))
    }

    /// Axis and angle of this rotation, angle in `[0, pi]`.
    ///
    /// The angle comes from the trace via
    /// `atan2(sqrt(max(0, 1 - w^2/4)), w/2)` with `w = trace - 1`, which
    /// stays accurate near 0 and pi where the usual `acos` form loses
    /// precision. The axis is the skew-symmetric part, with a diagonal
    /// fallback when that part vanishes near pi.
    pub fn to_axis_angle(&self) -> (Vec3, f32) {
        let m = self.0;
        let w = m.x_axis.x + m.y_axis.y + m.z_axis.z - 1.0;
        let angle = (1.0 - w * w / 4.0).max(0.0).sqrt().atan2(w / 2.0);

        if angle < MIN_ROTATION_ANGLE {
            return (Vec3::X, 0.0);
        }

        let raw = Vec3::new(
            m.y_axis.z - m.z_axis.y,
            m.z_axis.x - m.x_axis.z,
            m.x_axis.y - m.y_axis.x,
        );

        // The skew part shrinks with sin(angle); past this point the
        // diagonal carries the axis with far less cancellation.
        if angle > NEAR_PI_ANGLE {
            return (antipodal_axis(m, w / 2.0, raw), angle);
        }

        match raw.try_normalize() {
            Some(axis) => (axis, angle),
            None => (antipodal_axis(m, w / 2.0, raw), angle),
        }
    }

    /// Axis-angle vector whose length is the angle.
    pub fn to_scaled_axis(&self) -> Vec3 {
        let (axis, angle) = self.to_axis_angle();
        axis * angle
    }

    /// Angular distance to `other` in radians, in `[0, pi]`.
    pub fn angle_to(&self, other: &Rotation) -> f32 {
        (self.inverse() * *other).to_axis_angle().1
    }

    /// Shortest-path interpolation toward `other`.
    pub fn slerp(&self, other: &Rotation, t: f32) -> Self {
        let (axis, angle) = (self.inverse() * *other).to_axis_angle();
        *self * Self::from_axis_angle(axis, angle * t)
    }

    pub fn is_finite(&self) -> bool {
        self.0.x_axis.is_finite() && self.0.y_axis.is_finite() && self.0.z_axis.is_finite()
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl std::ops::Mul for Rotation {
    type Output = Rotation;

    fn mul(self, rhs: Rotation) -> Rotation {
        Rotation(self.0 * rhs.0)
    }
}

impl std::ops::Mul<Vec3> for Rotation {
    type Output = Vec3;

    fn mul(self, rhs: Vec3) -> Vec3 {
        self.0 * rhs
    }
}

fn orthonormalize(m: Mat3) -> Mat3 {
    let x = m.x_axis.try_normalize().unwrap_or(Vec3::X);
    let z = x
        .cross(m.y_axis)
        .try_normalize()
        .unwrap_or_else(|| x.any_orthonormal_vector());
    let y = z.cross(x);
    Mat3::from_cols(x, y, z)
}

/// Axis extraction for rotations near pi, where the skew terms are too
/// small to carry direction. The diagonal gives each component's
/// magnitude (`R_ii = cos + (1 - cos) * a_i^2`); the skew part still
/// carries the sign while the angle is short of exactly pi. At exactly pi
/// the sign is ambiguous anyway.
fn antipodal_axis(m: Mat3, cos: f32, raw: Vec3) -> Vec3 {
    let one_minus_cos = (1.0 - cos).max(f32::EPSILON);
    let diag = Vec3::new(m.x_axis.x, m.y_axis.y, m.z_axis.z);

    let axis = Vec3::new(
        ((diag.x - cos) / one_minus_cos).max(0.0).sqrt().copysign(raw.x),
        ((diag.y - cos) / one_minus_cos).max(0.0).sqrt().copysign(raw.y),
        ((diag.z - cos) / one_minus_cos).max(0.0).sqrt().copysign(raw.z),
    );

    axis.try_normalize().unwrap_or(Vec3::X)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    // Deterministic LCG so the randomized cases reproduce exactly.
    struct Lcg(u64);

    impl Lcg {
        fn next_f32(&mut self) -> f32 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((self.0 >> 40) as f32 / (1 << 24) as f32) * 2.0 - 1.0
        }

        fn next_axis(&mut self) -> Vec3 {
            loop {
                let v = Vec3::new(self.next_f32(), self.next_f32(), self.next_f32());
                if let Some(axis) = v.try_normalize() {
                    return axis;
                }
            }
        }
    }

    #[test]
    fn identity_round_trip() {
        let (axis, angle) = Rotation::IDENTITY.to_axis_angle();
        assert_eq!(angle, 0.0);
        assert!(axis.is_normalized());
    }

    #[test]
    fn axis_angle_round_trip_randomized() {
        let mut rng = Lcg(0x5EED);

        for i in 0..100 {
            let axis = rng.next_axis();
            // Sweep the full range, with the tail of the loop pinned close
            // to pi to cover near-antipodal rotations.
            let angle = if i >= 90 {
                PI - 1e-4 * (100 - i) as f32
            } else {
                (rng.next_f32() * 0.5 + 0.5) * (PI - 1e-3) + 1e-3
            };

            let r = Rotation::from_axis_angle(axis, angle);
            let (out_axis, out_angle) = r.to_axis_angle();
            let rebuilt = Rotation::from_axis_angle(out_axis, out_angle);

            assert!(
                r.angle_to(&rebuilt) < 1e-2,
                "round trip failed for axis {axis:?} angle {angle}"
            );
        }
    }

    #[test]
    fn exact_pi_rotation_recovers_axis() {
        let axis = Vec3::new(1.0, 2.0, -0.5).normalize();
        let r = Rotation::from_axis_angle(axis, PI);
        let (out_axis, out_angle) = r.to_axis_angle();

        assert!((out_angle - PI).abs() < 1e-3);
        // Axis sign is ambiguous at exactly pi.
        assert!(out_axis.dot(axis).abs() > 0.999);
    }

    #[test]
    fn tiny_rotation_is_identity() {
        let r = Rotation::from_axis_angle(Vec3::Y, 1e-8);
        assert_eq!(r, Rotation::IDENTITY);
        assert_eq!(Rotation::from_scaled_axis(Vec3::ZERO), Rotation::IDENTITY);
    }

    #[test]
    fn orthonormalize_repairs_drift() {
        let skewed = Mat3::from_cols(
            Vec3::new(1.02, 0.01, 0.0),
            Vec3::new(0.01, 0.98, 0.0),
            Vec3::new(0.0, 0.0, 1.05),
        );
        let m = Rotation::from_matrix(skewed).matrix();

        assert!((m.x_axis.length() - 1.0).abs() < 1e-6);
        assert!((m.y_axis.length() - 1.0).abs() < 1e-6);
        assert!((m.z_axis.length() - 1.0).abs() < 1e-6);
        assert!(m.x_axis.dot(m.y_axis).abs() < 1e-6);
        assert!((m.determinant() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn slerp_endpoints() {
        let a = Rotation::from_axis_angle(Vec3::Z, 0.3);
        let b = Rotation::from_axis_angle(Vec3::Z, 1.7);

        assert!(a.slerp(&b, 0.0).angle_to(&a) < 1e-5);
        assert!(a.slerp(&b, 1.0).angle_to(&b) < 1e-5);

        let mid = a.slerp(&b, 0.5);
        assert!((mid.angle_to(&a) - 0.7).abs() < 1e-4);
        assert!((mid.angle_to(&b) - 0.7).abs() < 1e-4);
    }

    #[test]
    fn compose_with_offset_reproduces_target() {
        let mut rng = Lcg(0xA11CE);

        for _ in 0..100 {
            let a = Rotation::from_axis_angle(rng.next_axis(), rng.next_f32() * PI);
            let b = Rotation::from_axis_angle(rng.next_axis(), rng.next_f32() * PI);

            let offset = (a.inverse() * b).to_scaled_axis();
            let rebuilt = a * Rotation::from_scaled_axis(offset);

            assert!(rebuilt.angle_to(&b) < 1e-2);
        }
    }
}
