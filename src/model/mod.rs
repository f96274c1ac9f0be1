//! Composite model assets.
//!
//! A [`Model`] wraps a multi-node asset loaded from a path. It is created
//! empty through [`Stage::insert_model`](crate::Stage::insert_model), which
//! gives it a stable anchor node straight away, so behaviours can be built for
//! it before it has loaded. Loading fills the anchor with the payload's node
//! tree; only then does [`Model::root_node`] report it.
//!
//! Animated models also own a [`ClipPlayer`] and can select, cross-fade and
//! cycle through their clips.

pub mod animation;
pub mod loader;

pub use animation::{Clip, ClipLoopHandle, ClipPlayer, Track};
pub use loader::{AssetLoader, BoxFuture, MemoryLoader, ModelData, ModelNode, StlLoader};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::graph::{Aabb, NodeId, SceneGraph};
use crate::script::ComponentRegistry;
use animation::ClipLoop;

/// Seconds a clip change takes to blend from the previous clip.
pub const CROSS_FADE_SECONDS: f32 = 0.5;

/// Handle to a [`Model`] owned by a [`Stage`](crate::Stage).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub(crate) usize);

/// Construction parameters for a [`Model`].
#[derive(Clone, Debug)]
pub struct ModelDesc {
    pub path: PathBuf,
    /// Display name applied to the root node after loading. Empty keeps the
    /// payload's own name.
    pub name: String,
    /// Compute a bounding volume and its helper on load.
    pub bounds: bool,
    /// Build a clip player on load.
    pub animated: bool,
}

impl ModelDesc {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name: String::new(),
            bounds: false,
            animated: false,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_bounds(mut self) -> Self {
        self.bounds = true;
        self
    }

    pub fn animated(mut self) -> Self {
        self.animated = true;
        self
    }
}

#[derive(Debug, Default)]
struct AnimationState {
    player: Option<ClipPlayer>,
    clips: HashMap<String, Clip>,
    names: Vec<String>,
    selected: Option<usize>,
    current: Option<String>,
    loops: Vec<ClipLoop>,
    speed: Option<f32>,
}

impl AnimationState {
    fn bind(&mut self, root: NodeId, clips: &[Clip]) {
        let mut player = ClipPlayer::new(root);
        if let Some(speed) = self.speed {
            player.set_time_scale(speed);
        }
        self.player = Some(player);
        self.clips = clips.iter().map(|c| (c.name.clone(), c.clone())).collect();
        self.names = clips.iter().map(|c| c.name.clone()).collect();
        self.selected = None;
        self.current = None;
    }

    fn select(&mut self, index: usize) -> bool {
        if self.selected == Some(index) {
            return false;
        }
        self.selected = Some(index);

        let Some(name) = self.names.get(index) else {
            return false;
        };
        let (Some(clip), Some(player)) = (self.clips.get(name), self.player.as_mut()) else {
            return false;
        };
        player.play(clip);
        if let Some(previous) = self.current.as_deref() {
            player.cross_fade(previous, name, CROSS_FADE_SECONDS);
        }
        log::debug!("clip '{}' selected", name);
        self.current = Some(name.clone());
        true
    }

    fn tick_loops(&mut self, dt: f32) {
        self.loops.retain(|l| !l.is_cancelled());
        let mut fired = 0;
        for timer in &mut self.loops {
            fired += timer.tick(dt);
        }
        for _ in 0..fired {
            if self.names.is_empty() {
                break;
            }
            let next = self.selected.map_or(0, |i| (i + 1) % self.names.len());
            self.select(next);
        }
    }
}

/// A loaded (or loading) multi-node asset.
#[derive(Debug)]
pub struct Model {
    id: AssetId,
    path: PathBuf,
    name: String,
    needs_bounds: bool,
    anchor: NodeId,
    payload: Option<ModelData>,
    bounds: Option<Aabb>,
    bounds_helper: Option<NodeId>,
    pub(crate) scripts: Option<ComponentRegistry>,
    animation: Option<AnimationState>,
}

impl Model {
    pub(crate) fn new(id: AssetId, desc: ModelDesc, anchor: NodeId) -> Self {
        Self {
            id,
            path: desc.path,
            name: desc.name,
            needs_bounds: desc.bounds,
            anchor,
            payload: None,
            bounds: None,
            bounds_helper: None,
            scripts: None,
            animation: desc.animated.then(AnimationState::default),
        }
    }

    pub fn id(&self) -> AssetId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The node the payload is loaded into. Exists from construction.
    pub fn anchor(&self) -> NodeId {
        self.anchor
    }

    /// Root of the loaded node tree, `None` until loaded.
    pub fn root_node(&self) -> Option<NodeId> {
        self.payload.as_ref().map(|_| self.anchor)
    }

    pub fn is_loaded(&self) -> bool {
        self.payload.is_some()
    }

    pub fn payload(&self) -> Option<&ModelData> {
        self.payload.as_ref()
    }

    pub fn is_animated(&self) -> bool {
        self.animation.is_some()
    }

    pub fn needs_bounds(&self) -> bool {
        self.needs_bounds
    }

    pub fn bounding_volume(&self) -> Option<Aabb> {
        self.bounds
    }

    pub fn bounds_helper(&self) -> Option<NodeId> {
        self.bounds_helper
    }

    /// Behaviours attached to this model, if any were ever attached.
    pub fn scripts(&self) -> Option<&ComponentRegistry> {
        self.scripts.as_ref()
    }

    /// Build the payload's node tree under the anchor and finish setup:
    /// display name, bounding volume, clip player.
    pub(crate) fn install(&mut self, graph: &mut SceneGraph, data: ModelData) {
        if self.payload.is_some() {
            graph.clear(self.anchor);
            self.bounds = None;
            self.bounds_helper = None;
        }

        let root = &data.root;
        graph.set_name(self.anchor, root.name.clone());
        graph.set_transform(self.anchor, root.transform);
        if let Some(mesh) = root.mesh {
            graph.set_mesh(self.anchor, mesh);
        }
        for child in &root.children {
            spawn_tree(graph, self.anchor, child);
        }

        if !self.name.is_empty() {
            graph.set_name(self.anchor, self.name.clone());
        }
        if self.needs_bounds {
            self.make_bounding_volume(graph, Some(self.anchor));
        }
        if let Some(animation) = self.animation.as_mut() {
            animation.bind(self.anchor, &data.clips);
        }
        self.payload = Some(data);
    }

    /// Compute the world-space bounds of `node` and add a helper outlining
    /// them.
    ///
    /// Does nothing when a bounding volume already exists or `node` is
    /// `None`. A subtree with no meshes gets an empty volume.
    pub fn make_bounding_volume(
        &mut self,
        graph: &mut SceneGraph,
        node: Option<NodeId>,
    ) -> Option<Aabb> {
        if self.bounds.is_some() {
            return self.bounds;
        }
        let node = node?;
        let aabb = graph.world_bounds(node).unwrap_or_default();
        let name = format!("{}-box-helper", graph.name(node).unwrap_or_default());
        self.bounds_helper = Some(graph.spawn_bounds_helper(node, name, aabb));
        self.bounds = Some(aabb);
        Some(aabb)
    }

    pub fn toggle_bounding_visual(&self, graph: &mut SceneGraph, visible: bool) {
        if let Some(helper) = self.bounds_helper {
            graph.set_visible(helper, visible);
        }
    }

    /// Take the helper out of the tree. The volume itself is kept.
    pub fn remove_bounding_visual(&self, graph: &mut SceneGraph) {
        if let Some(helper) = self.bounds_helper {
            graph.detach(helper);
        }
    }

    /// Clip names in payload order. Empty for static or unloaded models.
    pub fn clip_names(&self) -> &[String] {
        self.animation
            .as_ref()
            .map(|a| a.names.as_slice())
            .unwrap_or_default()
    }

    pub fn selected_clip(&self) -> Option<usize> {
        self.animation.as_ref().and_then(|a| a.selected)
    }

    pub fn selected_clip_name(&self) -> Option<&str> {
        let animation = self.animation.as_ref()?;
        animation.names.get(animation.selected?).map(String::as_str)
    }

    pub fn clip(&self, name: &str) -> Option<&Clip> {
        self.animation.as_ref()?.clips.get(name)
    }

    pub fn player(&self) -> Option<&ClipPlayer> {
        self.animation.as_ref()?.player.as_ref()
    }

    /// Switch to the clip at `index`, cross-fading from the current one.
    ///
    /// Selecting the clip that is already selected does nothing. Returns
    /// whether a clip started playing.
    pub fn select_clip(&mut self, index: usize) -> bool {
        match self.animation.as_mut() {
            Some(animation) => animation.select(index),
            None => false,
        }
    }

    /// Step to the next clip every `interval`, wrapping after the last.
    ///
    /// The timer runs on frame time. Returns `None` for static models.
    pub fn loop_clips(&mut self, interval: Duration) -> Option<ClipLoopHandle> {
        let animation = self.animation.as_mut()?;
        let handle = ClipLoopHandle::new();
        animation
            .loops
            .push(ClipLoop::new(interval.as_secs_f32(), handle.clone()));
        Some(handle)
    }

    /// Playback speed multiplier. Applied on load if set before.
    pub fn set_speed(&mut self, speed: f32) {
        if let Some(animation) = self.animation.as_mut() {
            animation.speed = Some(speed);
            if let Some(player) = animation.player.as_mut() {
                player.set_time_scale(speed);
            }
        }
    }

    pub(crate) fn has_player(&self) -> bool {
        self.player().is_some()
    }

    /// Run loop timers, then advance the player.
    pub(crate) fn advance(&mut self, dt: f32, graph: &mut SceneGraph) {
        let Some(animation) = self.animation.as_mut() else {
            return;
        };
        animation.tick_loops(dt);
        if let Some(player) = animation.player.as_mut() {
            player.update(dt, graph);
        }
    }

    pub(crate) fn cancel_loops(&mut self) {
        if let Some(animation) = self.animation.as_mut() {
            for timer in animation.loops.drain(..) {
                timer.cancel();
            }
        }
    }
}

fn spawn_tree(graph: &mut SceneGraph, parent: NodeId, node: &ModelNode) {
    let id = graph.spawn_child(parent, node.name.clone(), node.transform);
    if let Some(mesh) = node.mesh {
        graph.set_mesh(id, mesh);
    }
    for child in &node.children {
        spawn_tree(graph, id, child);
    }
}
