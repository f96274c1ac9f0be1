use glam::Vec3;

use crate::camera::{Camera, CameraController};
use crate::graph::SceneGraph;

/// Controls how the orbit camera moves.
#[derive(Clone, Copy, Debug, Default)]
pub enum OrbitMode {
    /// Camera holds its angles; the host changes them directly.
    #[default]
    Fixed,
    /// Camera auto-rotates around the target.
    AutoRotate {
        /// Rotation speed in radians per second (positive = counterclockwise from above).
        speed: f32,
    },
}

/// A camera controller that orbits around a target point.
///
/// # Example
/// ```
/// use stagehand::{OrbitCamera, OrbitMode, ShellConfig, Vec3};
///
/// let orbit = OrbitCamera::new()
///     .target(Vec3::ZERO)
///     .distance(8.0)
///     .mode(OrbitMode::AutoRotate { speed: 0.5 });
/// let config = ShellConfig::new().title("orbit");
/// # let _ = (orbit, config);
/// ```
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    /// Point the camera orbits around.
    pub target: Vec3,
    /// Distance from target.
    pub distance: f32,
    /// Horizontal angle in radians (yaw).
    pub azimuth: f32,
    /// Vertical angle in radians (pitch), clamped to avoid gimbal lock.
    pub elevation: f32,
    pub mode: OrbitMode,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 5.0,
            azimuth: 0.0,
            elevation: 0.3,
            mode: OrbitMode::Fixed,
            min_distance: 0.5,
            max_distance: 100.0,
        }
    }
}

const ELEVATION_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

impl OrbitCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target point to orbit around.
    pub fn target(mut self, target: impl Into<Vec3>) -> Self {
        self.target = target.into();
        self
    }

    /// Set the distance from target.
    pub fn distance(mut self, distance: f32) -> Self {
        self.distance = distance.clamp(self.min_distance, self.max_distance);
        self
    }

    pub fn mode(mut self, mode: OrbitMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the initial azimuth (horizontal angle) in radians.
    pub fn azimuth(mut self, azimuth: f32) -> Self {
        self.azimuth = azimuth;
        self
    }

    /// Set the initial elevation (vertical angle) in radians.
    pub fn elevation(mut self, elevation: f32) -> Self {
        self.elevation = elevation.clamp(-ELEVATION_LIMIT, ELEVATION_LIMIT);
        self
    }

    /// Camera position for the current angles and distance.
    pub fn eye(&self) -> Vec3 {
        // Spherical to Cartesian conversion
        let offset = Vec3::new(
            self.distance * self.elevation.cos() * self.azimuth.sin(),
            self.distance * self.elevation.sin(),
            self.distance * self.elevation.cos() * self.azimuth.cos(),
        );
        self.target + offset
    }
}

impl CameraController for OrbitCamera {
    fn update(&mut self, camera: &mut Camera, _graph: &SceneGraph, dt: f32) {
        if let OrbitMode::AutoRotate { speed } = self.mode {
            self.azimuth += speed * dt;
        }
        let position = self.eye();
        camera.position = position;
        camera.forward = (self.target - position).normalize_or(Vec3::NEG_Z);
        camera.up = Vec3::Y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn fixed_mode_places_camera_on_sphere() {
        let mut orbit = OrbitCamera::new().distance(10.0).elevation(0.0);
        let mut camera = Camera::new();
        orbit.update(&mut camera, &SceneGraph::new(), 1.0);

        assert_abs_diff_eq!(camera.position.z, 10.0, epsilon = 1e-5);
        assert_abs_diff_eq!(camera.forward.z, -1.0, epsilon = 1e-5);
        assert_eq!(orbit.azimuth, 0.0);
    }

    #[test]
    fn auto_rotate_advances_azimuth() {
        let mut orbit = OrbitCamera::new()
            .elevation(0.0)
            .mode(OrbitMode::AutoRotate {
                speed: std::f32::consts::FRAC_PI_2,
            });
        let mut camera = Camera::new();
        orbit.update(&mut camera, &SceneGraph::new(), 1.0);

        assert_abs_diff_eq!(camera.position.x, 5.0, epsilon = 1e-4);
        assert_abs_diff_eq!(camera.position.z, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn elevation_is_clamped() {
        let orbit = OrbitCamera::new().elevation(10.0);
        assert!(orbit.elevation < std::f32::consts::FRAC_PI_2);
    }
}
