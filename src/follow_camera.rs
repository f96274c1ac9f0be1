use glam::Vec3;

use crate::camera::{Camera, CameraController};
use crate::graph::{NodeId, SceneGraph};

/// A camera controller that rides behind a node.
///
/// The camera sits at `offset` in the node's local frame, so it turns with
/// the node. It looks one unit along the node's forward axis (+Z), shifted
/// by `look_offset` in world space.
///
/// # Example
/// ```
/// use stagehand::{FollowCamera, SceneGraph, Transform, Vec3};
///
/// let mut graph = SceneGraph::new();
/// let hero = graph.spawn_child(graph.root(), "hero", Transform::new());
///
/// let follow = FollowCamera::new(hero)
///     .offset(Vec3::new(0.0, 3.0, -6.0))
///     .look_offset(Vec3::new(0.0, 1.0, 0.0));
/// # let _ = follow;
/// ```
#[derive(Clone, Debug)]
pub struct FollowCamera {
    pub target: NodeId,
    /// Camera position in the target's local space.
    pub offset: Vec3,
    /// Added to the look-at point, in world space.
    pub look_offset: Vec3,
}

impl FollowCamera {
    pub fn new(target: NodeId) -> Self {
        Self {
            target,
            offset: Vec3::new(0.0, 2.0, -5.0),
            look_offset: Vec3::ZERO,
        }
    }

    pub fn offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn look_offset(mut self, look_offset: Vec3) -> Self {
        self.look_offset = look_offset;
        self
    }

    /// Point the camera looks at for the target's current pose, or `None`
    /// when the target is gone.
    pub fn look_point(&self, graph: &SceneGraph) -> Option<Vec3> {
        if !graph.contains(self.target) {
            return None;
        }
        let (_, rotation, position) = graph
            .world_matrix(self.target)
            .to_scale_rotation_translation();
        Some(rotation * Vec3::Z + position + self.look_offset)
    }
}

impl CameraController for FollowCamera {
    fn update(&mut self, camera: &mut Camera, graph: &SceneGraph, _dt: f32) {
        let Some(look) = self.look_point(graph) else {
            return;
        };
        let eye = graph.world_matrix(self.target).transform_point3(self.offset);
        camera.position = eye;
        camera.forward = (look - eye).normalize_or(camera.forward);
        camera.up = Vec3::Y;
    }
}
