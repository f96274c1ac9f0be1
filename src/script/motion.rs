//! Seek-to-target steering.

use glam::Vec3;

use crate::graph::Transform;

/// Tuning for [`seek_to_target`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Seek {
    /// Units moved per second.
    pub speed: f32,
    /// Fraction of the remaining turn applied each step, in `0.0..=1.0`.
    pub turn_blend: f32,
    /// Squared distance under which the target counts as reached.
    pub epsilon: f32,
}

impl Default for Seek {
    fn default() -> Self {
        Self {
            speed: 1.0,
            turn_blend: 0.1,
            epsilon: 1e-2,
        }
    }
}

impl Seek {
    pub fn new(speed: f32) -> Self {
        Self {
            speed,
            ..Default::default()
        }
    }

    pub fn turn_blend(mut self, turn_blend: f32) -> Self {
        self.turn_blend = turn_blend;
        self
    }

    pub fn epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }
}

/// Turn toward `target` and advance `speed * dt` along the straight line to it.
///
/// Returns `true` when the target is reached: either the transform was already
/// within `epsilon` (squared distance), or this step carried it past the
/// target so that it is now no closer than before. In the overshoot case
/// the position is left where the step put it, at most `speed * dt` beyond
/// the target.
pub fn seek_to_target(transform: &mut Transform, target: Vec3, dt: f32, seek: Seek) -> bool {
    let before = transform.position.distance_squared(target);
    if before < seek.epsilon {
        return true;
    }

    let facing = transform.facing(target);
    transform.rotation = transform
        .rotation
        .slerp(facing, seek.turn_blend.clamp(0.0, 1.0))
        .normalize();

    let dir = (target - transform.position).normalize_or_zero();
    transform.position += dir * seek.speed * dt;

    transform.position.distance_squared(target) >= before
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn already_there() {
        let mut t = Transform::from_position(Vec3::new(0.05, 0.0, 0.0));
        assert!(seek_to_target(&mut t, Vec3::ZERO, 1.0, Seek::default()));
        assert_eq!(t.position, Vec3::new(0.05, 0.0, 0.0));
    }

    #[test]
    fn steps_along_direction() {
        let mut t = Transform::new();
        let arrived = seek_to_target(&mut t, Vec3::new(10.0, 0.0, 0.0), 0.5, Seek::new(2.0));
        assert!(!arrived);
        assert_abs_diff_eq!(t.position.x, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(t.position.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn terminates_with_bounded_overshoot() {
        // 10 units at 3 units/step never lands exactly on the target
        let target = Vec3::new(0.0, 0.0, 10.0);
        let seek = Seek::new(3.0).epsilon(1e-4);
        let mut t = Transform::new();

        let mut steps = 0;
        while !seek_to_target(&mut t, target, 1.0, seek) {
            steps += 1;
            assert!(steps < 10, "seek never terminated");
        }
        assert_eq!(steps, 3);
        assert!(t.position.distance(target) <= seek.speed);
    }

    #[test]
    fn step_of_twice_the_distance_arrives() {
        // lands exactly as far past the target as it started before it
        let target = Vec3::new(0.0, 0.0, 10.0);
        let mut t = Transform::new();
        assert!(seek_to_target(&mut t, target, 1.0, Seek::new(20.0)));
        assert_abs_diff_eq!(t.position.z, 20.0, epsilon = 1e-5);
    }

    #[test]
    fn full_blend_faces_target() {
        let mut t = Transform::new();
        seek_to_target(
            &mut t,
            Vec3::new(5.0, 0.0, 0.0),
            0.1,
            Seek::new(1.0).turn_blend(1.0),
        );
        let forward = t.rotation * Vec3::Z;
        assert_abs_diff_eq!(forward.x, 1.0, epsilon = 1e-4);
    }
}
