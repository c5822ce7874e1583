//! Damped rotational spring used to ease camera and surface orientation
//! toward a moving goal without popping.
//!
//! The state is integrated with the closed-form solution of the linear
//! damped oscillator, applied to the axis-angle offset between the current
//! position and the goal. One branch per damping regime; each step is
//! exact for its regime, so the spring is stable for any `dt >= 0`.

use std::f32::consts::TAU;

use glam::Vec3;

use crate::math::Rotation;

/// Angular distance to goal below which the spring counts as settled
/// (0.01 degrees).
const SLEEP_ANGLE: f32 = 0.01 * (TAU / 360.0);

/// Angular speed below which the spring counts as settled (0.1 deg/s).
const SLEEP_RATE: f32 = 0.1 * (TAU / 360.0);

#[derive(Debug, Clone, Copy)]
pub struct RotationalSpring {
    damping_ratio: f32,
    frequency: f32,
    position: Rotation,
    velocity: Vec3,
    goal: Rotation,
}

impl RotationalSpring {
    /// `damping_ratio` of 1 is critical damping; `frequency` is the natural
    /// frequency in Hz. Both rotations are re-orthonormalized. Degenerate
    /// parameters (negative frequency, non-finite inputs) are not validated;
    /// this runs once per tick and the contract is on the caller.
    pub fn new(
        damping_ratio: f32,
        frequency: f32,
        position: Rotation,
        goal: Rotation,
    ) -> Self {
        Self {
            damping_ratio,
            frequency,
            position: position.orthonormalized(),
            velocity: Vec3::ZERO,
            goal: goal.orthonormalized(),
        }
    }

    pub fn damping_ratio(&self) -> f32 {
        self.damping_ratio
    }

    pub fn set_damping_ratio(&mut self, damping_ratio: f32) {
        self.damping_ratio = damping_ratio;
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    pub fn position(&self) -> Rotation {
        self.position
    }

    pub fn set_position(&mut self, position: Rotation) {
        self.position = position.orthonormalized();
    }

    /// Angular velocity as an axis-angle vector in rad/s.
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    pub fn goal(&self) -> Rotation {
        self.goal
    }

    pub fn set_goal(&mut self, goal: Rotation) {
        self.goal = goal.orthonormalized();
    }

    /// Advances the spring by `dt` seconds and returns the new position.
    /// The goal is never mutated.
    pub fn step(&mut self, dt: f32) -> Rotation {
        let omega = TAU * self.frequency;
        let zeta = self.damping_ratio;

        // Displacement from the goal, expressed as a world-frame
        // axis-angle vector so that position = exp(x) * goal.
        let x0 = (self.position * self.goal.inverse()).to_scaled_axis();
        let v0 = self.velocity;

        let (x, v) = if zeta < 1.0 {
            // Radicands are clamped before the sqrt: a damping ratio that
            // is 1 up to rounding must not turn into a NaN.
            let alpha = omega * (1.0 - zeta * zeta).max(0.0).sqrt();
            if alpha <= f32::EPSILON {
                step_critical(x0, v0, omega, dt)
            } else {
                step_underdamped(x0, v0, omega, zeta, alpha, dt)
            }
        } else if zeta > 1.0 {
            let beta = omega * (zeta * zeta - 1.0).max(0.0).sqrt();
            if beta <= f32::EPSILON {
                step_critical(x0, v0, omega, dt)
            } else {
                step_overdamped(x0, v0, omega, zeta, beta, dt)
            }
        } else {
            step_critical(x0, v0, omega, dt)
        };

        self.velocity = v;
        self.position = Rotation::from_scaled_axis(x) * self.goal;
        self.position
    }

    /// True once both the angular distance to the goal and the angular
    /// speed are negligible. Callers use this to skip redundant stepping;
    /// the spring itself never skips.
    pub fn can_sleep(&self) -> bool {
        self.position.angle_to(&self.goal) < SLEEP_ANGLE && self.velocity.length() < SLEEP_RATE
    }
}

fn step_critical(x0: Vec3, v0: Vec3, omega: f32, dt: f32) -> (Vec3, Vec3) {
    let decay = (-omega * dt).exp();
    let c = v0 + x0 * omega;
    let x = (x0 + c * dt) * decay;
    let v = (v0 - c * (omega * dt)) * decay;
    (x, v)
}

fn step_underdamped(
    x0: Vec3,
    v0: Vec3,
    omega: f32,
    zeta: f32,
    alpha: f32,
    dt: f32,
) -> (Vec3, Vec3) {
    let decay = (-zeta * omega * dt).exp();
    let (sin, cos) = (alpha * dt).sin_cos();
    let x = (x0 * cos + (v0 + x0 * (zeta * omega)) * (sin / alpha)) * decay;
    let v = (v0 * cos - (x0 * (omega * omega) + v0 * (zeta * omega)) * (sin / alpha)) * decay;
    (x, v)
}

fn step_overdamped(
    x0: Vec3,
    v0: Vec3,
    omega: f32,
    zeta: f32,
    beta: f32,
    dt: f32,
) -> (Vec3, Vec3) {
    let r1 = -zeta * omega + beta;
    let r2 = -zeta * omega - beta;
    let c2 = (v0 - x0 * r1) / (r2 - r1);
    let c1 = x0 - c2;
    let e1 = (r1 * dt).exp();
    let e2 = (r2 * dt).exp();
    (c1 * e1 + c2 * e2, c1 * (r1 * e1) + c2 * (r2 * e2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::f32::consts::FRAC_PI_2;

    fn quarter_turn_x() -> Rotation {
        Rotation::from_axis_angle(Vec3::X, FRAC_PI_2)
    }

    #[test]
    fn sleeps_at_goal_with_zero_velocity() {
        let goal = quarter_turn_x();
        let spring = RotationalSpring::new(1.0, 2.0, goal, goal);
        assert!(spring.can_sleep());
    }

    #[test]
    fn step_zero_is_a_no_op() {
        for zeta in [0.3, 1.0, 2.5] {
            let mut spring =
                RotationalSpring::new(zeta, 1.5, Rotation::IDENTITY, quarter_turn_x());
            spring.set_velocity(Vec3::new(0.2, -0.1, 0.4));

            let before_pos = spring.position();
            let before_vel = spring.velocity();
            spring.step(0.0);

            assert!(spring.position().angle_to(&before_pos) < 1e-5);
            assert!(spring.velocity().distance(before_vel) < 1e-5);
        }
    }

    #[test]
    fn output_stays_finite_in_every_regime() {
        let dts = [0.0, 1e-4, 1.0 / 60.0, 0.5, 10.0];
        let zetas = [0.0, 0.2, 0.999_999, 1.0, 1.000_001, 4.0];
        let freqs = [0.0, 0.5, 60.0];

        for &zeta in &zetas {
            for &freq in &freqs {
                let mut spring =
                    RotationalSpring::new(zeta, freq, Rotation::IDENTITY, quarter_turn_x());
                for &dt in &dts {
                    let position = spring.step(dt);
                    assert!(position.is_finite(), "zeta={zeta} freq={freq} dt={dt}");
                    assert!(spring.velocity().is_finite());
                }
            }
        }
    }

    #[test]
    fn critical_and_overdamped_converge_monotonically() {
        for zeta in [1.0, 1.5, 3.0] {
            let mut spring =
                RotationalSpring::new(zeta, 1.0, Rotation::IDENTITY, quarter_turn_x());

            let mut last = spring.position().angle_to(&spring.goal());
            for _ in 0..40 {
                spring.step(1.0 / 30.0);
                let distance = spring.position().angle_to(&spring.goal());
                assert!(distance <= last + 1e-5, "zeta={zeta}");
                last = distance;
            }
        }
    }

    #[test]
    fn underdamped_oscillates_but_settles() {
        let mut spring = RotationalSpring::new(0.2, 1.0, Rotation::IDENTITY, quarter_turn_x());

        let mut overshot = false;
        for _ in 0..600 {
            spring.step(1.0 / 60.0);
            // Overshoot shows up as the offset axis flipping past the goal.
            let offset = (spring.position() * spring.goal().inverse()).to_scaled_axis();
            if offset.x > 1e-3 {
                overshot = true;
            }
        }

        assert!(overshot);
        assert!(spring.position().angle_to(&spring.goal()) < 0.01);
    }

    #[test]
    fn goal_is_never_mutated() {
        let goal = quarter_turn_x();
        let mut spring = RotationalSpring::new(0.5, 3.0, Rotation::IDENTITY, goal);
        for _ in 0..20 {
            spring.step(0.016);
        }
        assert_eq!(spring.goal(), goal);
    }

    #[test]
    fn critically_damped_unit_spring_settles_in_ten_seconds() {
        let mut spring =
            RotationalSpring::new(1.0, 1.0, Rotation::IDENTITY, Rotation::IDENTITY);
        spring.set_goal(quarter_turn_x());

        for _ in 0..10 {
            spring.step(1.0);
        }

        assert!(spring.can_sleep());
        let distance_deg = spring.position().angle_to(&spring.goal()).to_degrees();
        assert!(distance_deg < 0.1, "distance was {distance_deg} degrees");
    }

    #[test]
    fn parameters_can_change_mid_flight() {
        let mut spring = RotationalSpring::new(0.3, 1.0, Rotation::IDENTITY, quarter_turn_x());
        for _ in 0..5 {
            spring.step(0.016);
        }

        spring.set_damping_ratio(1.0);
        spring.set_frequency(4.0);
        for _ in 0..600 {
            spring.step(0.016);
        }

        assert!(spring.can_sleep());
    }
}
