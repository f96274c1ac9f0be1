//! The scene graph that behaviours and models attach to.
//!
//! Nodes are `hecs` entities. Each node carries a [`Transform`], its name and
//! visibility, and a parent/child link. Render-side data (mesh bounds, debug
//! helpers) are optional components on the same entity, so disposing a node's
//! graphics resources is just removing those components.
//!
//! # Example
//!
//! ```
//! use stagehand::{SceneGraph, Transform, Vec3};
//!
//! let mut graph = SceneGraph::new();
//! let crate_node = graph.spawn("crate");
//! graph.add_child(graph.root(), crate_node);
//!
//! if let Some(t) = graph.transform_mut(crate_node) {
//!     t.position = Vec3::new(0.0, 1.0, 0.0);
//! }
//! assert_eq!(graph.parent(crate_node), Some(graph.root()));
//! ```

mod bounds;
mod transform;

pub use bounds::Aabb;
pub use transform::Transform;

use glam::Mat4;

/// Type-safe handle to a node in a [`SceneGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) hecs::Entity);

/// Name and visibility of a node.
#[derive(Clone, Debug)]
struct NodeInfo {
    name: String,
    visible: bool,
}

/// Parent/child links of a node.
#[derive(Clone, Debug, Default)]
struct Hierarchy {
    parent: Option<hecs::Entity>,
    children: Vec<hecs::Entity>,
}

/// Local-space bounds of the mesh drawn at a node.
///
/// This is the only render resource the graph tracks; removing it is what
/// [`SceneGraph::dispose_resources`] means by disposal.
#[derive(Clone, Copy, Debug)]
pub struct MeshBounds(pub Aabb);

/// Marks a node as the debug proxy drawn for a bounding volume.
#[derive(Clone, Copy, Debug)]
pub struct BoundsHelper {
    /// The world-space volume the helper outlines.
    pub aabb: Aabb,
}

/// A tree of nodes rooted at a single scene node.
pub struct SceneGraph {
    world: hecs::World,
    root: hecs::Entity,
}

impl SceneGraph {
    /// Create a graph containing only the root node, named `"Scene"`.
    pub fn new() -> Self {
        let mut world = hecs::World::new();
        let root = world.spawn((
            NodeInfo {
                name: "Scene".to_string(),
                visible: true,
            },
            Hierarchy::default(),
            Transform::default(),
        ));
        Self { world, root }
    }

    /// The scene root.
    pub fn root(&self) -> NodeId {
        NodeId(self.root)
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.world.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.world.len() == 0
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.world.contains(node.0)
    }

    /// Spawn a detached node with an identity transform.
    pub fn spawn(&mut self, name: impl Into<String>) -> NodeId {
        self.spawn_with(name, Transform::default())
    }

    /// Spawn a detached node with the given transform.
    pub fn spawn_with(&mut self, name: impl Into<String>, transform: Transform) -> NodeId {
        NodeId(self.world.spawn((
            NodeInfo {
                name: name.into(),
                visible: true,
            },
            Hierarchy::default(),
            transform,
        )))
    }

    /// Spawn a node and insert it under `parent` in one step.
    pub fn spawn_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        transform: Transform,
    ) -> NodeId {
        let node = self.spawn_with(name, transform);
        self.add_child(parent, node);
        node
    }

    /// Insert `child` under `parent`, detaching it from any previous parent.
    ///
    /// Returns `false` without changing anything if either node is missing or
    /// the insertion would create a cycle.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.contains(parent) || !self.contains(child) {
            return false;
        }
        if parent == child || self.is_ancestor(child, parent) {
            return false;
        }
        self.detach(child);

        if let Ok(h) = self.world.query_one_mut::<&mut Hierarchy>(parent.0) {
            h.children.push(child.0);
        }
        if let Ok(h) = self.world.query_one_mut::<&mut Hierarchy>(child.0) {
            h.parent = Some(parent.0);
        }
        true
    }

    /// Remove `node` from its parent's children. The node stays alive.
    pub fn detach(&mut self, node: NodeId) {
        let parent = match self.world.query_one_mut::<&mut Hierarchy>(node.0) {
            Ok(h) => h.parent.take(),
            Err(_) => None,
        };
        if let Some(parent) = parent {
            if let Ok(h) = self.world.query_one_mut::<&mut Hierarchy>(parent) {
                h.children.retain(|c| *c != node.0);
            }
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.world
            .get::<&Hierarchy>(node.0)
            .ok()
            .and_then(|h| h.parent)
            .map(NodeId)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.world
            .get::<&Hierarchy>(node.0)
            .map(|h| h.children.iter().copied().map(NodeId).collect())
            .unwrap_or_default()
    }

    /// Whether `ancestor` appears on the parent chain of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// `node` and all of its descendants, depth-first in pre-order, children in
    /// insertion order.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(node) {
            return out;
        }
        let mut stack = vec![node.0];
        while let Some(entity) = stack.pop() {
            out.push(NodeId(entity));
            if let Ok(h) = self.world.get::<&Hierarchy>(entity) {
                stack.extend(h.children.iter().rev().copied());
            }
        }
        out
    }

    /// First node named `name` in the subtree under `from`, pre-order.
    pub fn find_by_name(&self, from: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(from)
            .into_iter()
            .find(|n| self.name(*n).as_deref() == Some(name))
    }

    pub fn name(&self, node: NodeId) -> Option<String> {
        self.world
            .get::<&NodeInfo>(node.0)
            .ok()
            .map(|info| info.name.clone())
    }

    pub fn set_name(&mut self, node: NodeId, name: impl Into<String>) {
        if let Ok(info) = self.world.query_one_mut::<&mut NodeInfo>(node.0) {
            info.name = name.into();
        }
    }

    pub fn is_visible(&self, node: NodeId) -> bool {
        self.world
            .get::<&NodeInfo>(node.0)
            .map(|info| info.visible)
            .unwrap_or(false)
    }

    pub fn set_visible(&mut self, node: NodeId, visible: bool) {
        if let Ok(info) = self.world.query_one_mut::<&mut NodeInfo>(node.0) {
            info.visible = visible;
        }
    }

    /// Copy of the node's local transform.
    pub fn transform(&self, node: NodeId) -> Option<Transform> {
        self.world.get::<&Transform>(node.0).ok().map(|t| *t)
    }

    pub fn transform_mut(&mut self, node: NodeId) -> Option<&mut Transform> {
        self.world.query_one_mut::<&mut Transform>(node.0).ok()
    }

    pub fn set_transform(&mut self, node: NodeId, transform: Transform) {
        if let Some(t) = self.transform_mut(node) {
            *t = transform;
        }
    }

    /// Local-to-world matrix, composed through every ancestor.
    pub fn world_matrix(&self, node: NodeId) -> Mat4 {
        let mut matrix = self
            .transform(node)
            .map(|t| t.matrix())
            .unwrap_or(Mat4::IDENTITY);
        let mut current = self.parent(node);
        while let Some(p) = current {
            if let Some(t) = self.transform(p) {
                matrix = t.matrix() * matrix;
            }
            current = self.parent(p);
        }
        matrix
    }

    /// Attach mesh bounds to a node, replacing any previous mesh.
    pub fn set_mesh(&mut self, node: NodeId, bounds: Aabb) {
        let _ = self.world.insert_one(node.0, MeshBounds(bounds));
    }

    pub fn mesh_bounds(&self, node: NodeId) -> Option<Aabb> {
        self.world.get::<&MeshBounds>(node.0).ok().map(|m| m.0)
    }

    /// World-space box enclosing every mesh in the subtree under `node`.
    ///
    /// Returns `None` when the subtree holds no mesh.
    pub fn world_bounds(&self, node: NodeId) -> Option<Aabb> {
        let aabb = self
            .descendants(node)
            .into_iter()
            .filter_map(|n| {
                self.mesh_bounds(n)
                    .map(|local| local.transformed(self.world_matrix(n)))
            })
            .fold(Aabb::empty(), |acc, b| acc.union(&b));
        (!aabb.is_empty()).then_some(aabb)
    }

    /// Spawn a debug proxy outlining `aabb` as a child of `parent`.
    pub fn spawn_bounds_helper(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        aabb: Aabb,
    ) -> NodeId {
        let node = self.spawn(name);
        let _ = self.world.insert_one(node.0, BoundsHelper { aabb });
        self.add_child(parent, node);
        node
    }

    pub fn bounds_helper(&self, node: NodeId) -> Option<BoundsHelper> {
        self.world.get::<&BoundsHelper>(node.0).ok().map(|h| *h)
    }

    pub fn set_bounds_helper(&mut self, node: NodeId, aabb: Aabb) {
        if let Ok(helper) = self.world.query_one_mut::<&mut BoundsHelper>(node.0) {
            helper.aabb = aabb;
        }
    }

    /// Release the render resources held by every node under `node`.
    ///
    /// Returns how many nodes had something to release.
    pub fn dispose_resources(&mut self, node: NodeId) -> usize {
        let mut released = 0;
        for n in self.descendants(node) {
            let had_mesh = self.world.remove_one::<MeshBounds>(n.0).is_ok();
            let had_helper = self.world.remove_one::<BoundsHelper>(n.0).is_ok();
            if had_mesh || had_helper {
                released += 1;
            }
        }
        released
    }

    /// Release the render resources of every node in the world, attached to
    /// the tree or not.
    pub fn dispose_all(&mut self) -> usize {
        let nodes: Vec<hecs::Entity> = self.world.iter().map(|e| e.entity()).collect();
        let mut released = 0;
        for n in nodes {
            let had_mesh = self.world.remove_one::<MeshBounds>(n).is_ok();
            let had_helper = self.world.remove_one::<BoundsHelper>(n).is_ok();
            if had_mesh || had_helper {
                released += 1;
            }
        }
        released
    }

    /// Destroy every node except the root, including detached ones.
    pub fn reset(&mut self) {
        let doomed: Vec<hecs::Entity> = self
            .world
            .iter()
            .map(|e| e.entity())
            .filter(|e| *e != self.root)
            .collect();
        for e in doomed {
            let _ = self.world.despawn(e);
        }
        if let Ok(h) = self.world.query_one_mut::<&mut Hierarchy>(self.root) {
            h.children.clear();
        }
    }

    /// Detach and destroy `node` together with its whole subtree.
    ///
    /// The root itself cannot be despawned; use [`Self::clear`] instead.
    pub fn despawn(&mut self, node: NodeId) {
        if node.0 == self.root {
            return;
        }
        self.detach(node);
        for n in self.descendants(node) {
            let _ = self.world.despawn(n.0);
        }
    }

    /// Destroy every descendant of `node`, leaving `node` itself in place.
    pub fn clear(&mut self, node: NodeId) {
        for child in self.children(node) {
            self.despawn(child);
        }
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
