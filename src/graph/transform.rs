use glam::{Mat3, Mat4, Quat, Vec3};

/// Local transform of a scene node relative to its parent.
///
/// Stored as a hecs component on every node spawned by
/// [`SceneGraph`](super::SceneGraph).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Translation relative to the parent node.
    pub position: Vec3,
    /// Rotation as a unit quaternion.
    pub rotation: Quat,
    /// Scale factors for each axis.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Creates a new identity transform (origin, no rotation, unit scale).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transform positioned at the given location.
    ///
    /// # Example
    ///
    /// ```
    /// use stagehand::{Transform, Vec3};
    ///
    /// let transform = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
    /// assert_eq!(transform.position, Vec3::new(1.0, 2.0, 3.0));
    /// ```
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Sets the position (translation) component.
    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Sets the rotation component.
    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets non-uniform scale factors for each axis.
    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Sets uniform scale on all axes.
    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Converts this transform to a 4×4 matrix in SRT order.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Rotation that points the local +Z axis from `position` toward `target`.
    ///
    /// Returns the current rotation unchanged when `target` coincides with the
    /// position.
    pub fn facing(&self, target: Vec3) -> Quat {
        let forward = target - self.position;
        if forward.length_squared() <= f32::EPSILON {
            return self.rotation;
        }
        let z = forward.normalize();

        let mut x = Vec3::Y.cross(z);
        if x.length_squared() <= f32::EPSILON {
            // Looking straight up or down: borrow Z as the up reference.
            x = Vec3::Z.cross(z);
        }
        let x = x.normalize();
        let y = z.cross(x);

        Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize()
    }

    /// Rotates so the local +Z axis faces `target`.
    pub fn look_at(&mut self, target: Vec3) {
        self.rotation = self.facing(target);
    }

    /// Rotates around the local Y axis by `angle` radians.
    pub fn rotate_y(&mut self, angle: f32) {
        self.rotation = (self.rotation * Quat::from_rotation_y(angle)).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn look_at_points_forward_axis_at_target() {
        let mut t = Transform::from_position(Vec3::new(1.0, 0.0, 1.0));
        t.look_at(Vec3::new(4.0, 0.0, 5.0));

        let forward = t.rotation * Vec3::Z;
        assert_abs_diff_eq!(forward.x, 0.6, epsilon = 1e-5);
        assert_abs_diff_eq!(forward.y, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(forward.z, 0.8, epsilon = 1e-5);
    }

    #[test]
    fn look_at_straight_up_stays_finite() {
        let mut t = Transform::new();
        t.look_at(Vec3::new(0.0, 10.0, 0.0));

        let forward = t.rotation * Vec3::Z;
        assert!(forward.is_finite());
        assert!(forward.y > 0.99);
    }

    #[test]
    fn look_at_own_position_keeps_rotation() {
        let rotation = Quat::from_rotation_y(0.3);
        let mut t = Transform::new().rotation(rotation);
        t.look_at(Vec3::ZERO);
        assert_eq!(t.rotation, rotation);
    }
}
