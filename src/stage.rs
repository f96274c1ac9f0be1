//! The scene a shell drives: graph, behaviours and models in one place.
//!
//! [`Stage::add`] is the single entry point for putting things into the scene.
//! Plain nodes go under the root immediately. Models are queued and spliced in
//! by [`Stage::flush`], which the shell calls once the load phase has finished
//! and before the first frame.
//!
//! Behaviours can sit on plain nodes or on models. Each frame the stage visits
//! them in a fixed order: first every flushed model's behaviours (in flush
//! order), then the behaviours of every node under the root, depth-first in
//! pre-order. Model behaviours live on the model rather than on its nodes, so
//! the second pass never reaches them again.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use futures::future::join_all;

use crate::error::{Result, SceneError};
use crate::graph::{NodeId, SceneGraph};
use crate::model::{AssetId, AssetLoader, Model, ModelData, ModelDesc, StlLoader};
use crate::progress::LoadTracker;
use crate::script::registry::RegistrySlot;
use crate::script::{Behavior, ComponentRegistry, RemoveOutcome};

/// Anything that can be handed to [`Stage::add`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneItem {
    Node(NodeId),
    Model(AssetId),
}

impl From<NodeId> for SceneItem {
    fn from(node: NodeId) -> Self {
        SceneItem::Node(node)
    }
}

impl From<AssetId> for SceneItem {
    fn from(id: AssetId) -> Self {
        SceneItem::Model(id)
    }
}

/// What a behaviour is attached to: a plain node or a whole model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Node(NodeId),
    Model(AssetId),
}

impl From<NodeId> for Target {
    fn from(node: NodeId) -> Self {
        Target::Node(node)
    }
}

impl From<AssetId> for Target {
    fn from(id: AssetId) -> Self {
        Target::Model(id)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Only behaviours on nodes under the root.
    Primitive,
    /// Flushed models first, then nodes under the root.
    All,
}

pub struct Stage {
    graph: SceneGraph,
    scripts: HashMap<NodeId, ComponentRegistry>,
    models: Vec<Model>,
    pending: Vec<AssetId>,
    flushed: Vec<AssetId>,
    players: Vec<AssetId>,
    loader: Rc<dyn AssetLoader>,
    tracker: LoadTracker,
    asset_root: Option<PathBuf>,
}

impl Stage {
    /// A stage loading models with [`StlLoader`].
    pub fn new() -> Self {
        Self::with_loader(StlLoader)
    }

    pub fn with_loader(loader: impl AssetLoader + 'static) -> Self {
        Self {
            graph: SceneGraph::new(),
            scripts: HashMap::new(),
            models: Vec::new(),
            pending: Vec::new(),
            flushed: Vec::new(),
            players: Vec::new(),
            loader: Rc::new(loader),
            tracker: LoadTracker::new(),
            asset_root: None,
        }
    }

    /// Directory relative model paths are resolved against.
    pub fn set_asset_root(&mut self, root: Option<PathBuf>) {
        self.asset_root = root;
    }

    pub fn set_loader(&mut self, loader: impl AssetLoader + 'static) {
        self.loader = Rc::new(loader);
    }

    pub fn tracker(&self) -> &LoadTracker {
        &self.tracker
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn root(&self) -> NodeId {
        self.graph.root()
    }

    // ---- models -----------------------------------------------------------

    /// Create a model and its anchor node. The model is not in the scene
    /// until it is [added](Self::add) and flushed.
    pub fn insert_model(&mut self, desc: ModelDesc) -> AssetId {
        let id = AssetId(self.models.len());
        let anchor_name = if desc.name.is_empty() {
            "model".to_string()
        } else {
            desc.name.clone()
        };
        let anchor = self.graph.spawn(anchor_name);
        self.models.push(Model::new(id, desc, anchor));
        id
    }

    pub fn model(&self, id: AssetId) -> Option<&Model> {
        self.models.get(id.0)
    }

    pub fn model_mut(&mut self, id: AssetId) -> Option<&mut Model> {
        self.models.get_mut(id.0)
    }

    /// Mutable access to a model together with the graph, for the model
    /// operations that touch nodes.
    pub fn model_and_graph(&mut self, id: AssetId) -> Option<(&mut Model, &mut SceneGraph)> {
        let model = self.models.get_mut(id.0)?;
        Some((model, &mut self.graph))
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.iter()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.asset_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Load a model's payload into its anchor.
    ///
    /// With `payload` set the loader is skipped. Errors from the loader are
    /// returned unchanged and leave the model unloaded.
    pub async fn load_model(&mut self, id: AssetId, payload: Option<ModelData>) -> Result<()> {
        let model = self.models.get(id.0).ok_or(SceneError::UnknownAsset(id))?;
        let data = match payload {
            Some(data) => data,
            None => {
                let path = self.resolve(model.path());
                let item = path.display().to_string();
                let loader = Rc::clone(&self.loader);
                self.tracker.item_start(&item);
                match loader.load(&path).await {
                    Ok(data) => {
                        self.tracker.item_end(&item);
                        data
                    }
                    Err(e) => {
                        log::error!("failed to load '{}': {}", item, e);
                        self.tracker.item_error(&item);
                        return Err(e.into());
                    }
                }
            }
        };

        let model = self
            .models
            .get_mut(id.0)
            .ok_or(SceneError::UnknownAsset(id))?;
        model.install(&mut self.graph, data);
        Ok(())
    }

    /// Fetch several models concurrently and install every one that loaded.
    ///
    /// All fetches are awaited even when some fail; the first failure (in
    /// `ids` order) is returned afterwards. An unknown id fails before
    /// anything is fetched.
    pub async fn load_models(&mut self, ids: &[AssetId]) -> Result<()> {
        let mut jobs = Vec::with_capacity(ids.len());
        for &id in ids {
            let model = self.models.get(id.0).ok_or(SceneError::UnknownAsset(id))?;
            let path = self.resolve(model.path());
            let item = path.display().to_string();
            jobs.push((id, path, item));
        }
        for (_, _, item) in &jobs {
            self.tracker.item_start(item);
        }

        let loader = Rc::clone(&self.loader);
        let results = join_all(jobs.iter().map(|(_, path, _)| loader.load(path))).await;

        let mut first_error = None;
        for ((id, _, item), result) in jobs.iter().zip(results) {
            match result {
                Ok(data) => {
                    self.tracker.item_end(item);
                    if let Some(model) = self.models.get_mut(id.0) {
                        model.install(&mut self.graph, data);
                    }
                }
                Err(e) => {
                    log::error!("failed to load '{}': {}", item, e);
                    self.tracker.item_error(item);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// A new model sharing a loaded model's payload, under a new name.
    ///
    /// The copy has its own anchor and nodes, no behaviours, and a bounding
    /// volume only if `with_bounds` is set. Returns `None` when `id` is
    /// unknown or not loaded.
    pub fn clone_model(
        &mut self,
        id: AssetId,
        name: impl Into<String>,
        with_bounds: bool,
    ) -> Option<AssetId> {
        let source = self.models.get(id.0)?;
        let data = source.payload()?.clone();
        let mut desc = ModelDesc::new(source.path()).name(name);
        desc.bounds = with_bounds;
        desc.animated = source.is_animated();

        let copy = self.insert_model(desc);
        let model = self.models.get_mut(copy.0)?;
        model.install(&mut self.graph, data);
        Some(copy)
    }

    // ---- scene membership -------------------------------------------------

    /// Put a node or a model into the scene.
    ///
    /// Nodes are inserted under the root right away. Models are queued for the
    /// next [`flush`](Self::flush); adding a model that is already queued or
    /// already flushed does nothing. Returns whether anything changed.
    pub fn add(&mut self, item: impl Into<SceneItem>) -> bool {
        match item.into() {
            SceneItem::Node(node) => {
                let root = self.graph.root();
                self.graph.add_child(root, node)
            }
            SceneItem::Model(id) => {
                if id.0 >= self.models.len()
                    || self.pending.contains(&id)
                    || self.flushed.contains(&id)
                {
                    return false;
                }
                self.pending.push(id);
                true
            }
        }
    }

    /// Models added but not yet flushed, in the order they were added.
    pub fn pending(&self) -> &[AssetId] {
        &self.pending
    }

    /// Models that have been spliced into the tree, in flush order.
    pub fn flushed(&self) -> &[AssetId] {
        &self.flushed
    }

    /// Splice every queued model's root under the scene root and register its
    /// clip player. The queue is empty afterwards.
    ///
    /// Models that have not loaded yet are dropped from the queue with a
    /// warning. Returns how many models were inserted.
    pub fn flush(&mut self) -> usize {
        let root = self.graph.root();
        let mut inserted = 0;
        for id in std::mem::take(&mut self.pending) {
            let Some(model) = self.models.get(id.0) else {
                continue;
            };
            let Some(model_root) = model.root_node() else {
                log::warn!("model '{}' added before it loaded", model.path().display());
                continue;
            };
            self.graph.add_child(root, model_root);
            if model.has_player() {
                self.players.push(id);
            }
            self.flushed.push(id);
            inserted += 1;
        }
        log::debug!("flushed {} model(s) into the scene", inserted);
        inserted
    }

    // ---- behaviours -------------------------------------------------------

    fn slot_mut(&mut self, target: Target) -> Option<&mut Option<ComponentRegistry>> {
        match target {
            Target::Model(id) => self.models.get_mut(id.0).map(|m| &mut m.scripts),
            Target::Node(_) => None,
        }
    }

    /// A model's anchor node stands for the model: behaviours attached to it
    /// share the model's registry.
    fn resolve_target(&self, target: impl Into<Target>) -> Target {
        match target.into() {
            Target::Node(node) => self
                .models
                .iter()
                .find(|m| m.anchor() == node)
                .map_or(Target::Node(node), |m| Target::Model(m.id())),
            target => target,
        }
    }

    /// The node a behaviour on `target` would own: the node itself, or the
    /// model's anchor.
    pub fn owner_node(&self, target: impl Into<Target>) -> Option<NodeId> {
        match target.into() {
            Target::Node(node) => Some(node),
            Target::Model(id) => self.models.get(id.0).map(|m| m.anchor()),
        }
    }

    /// Attach `behavior`, replacing any behaviour of the same type.
    ///
    /// Attaching to a model's anchor node is the same as attaching to the
    /// model. Returns `None` only for an unknown model.
    pub fn attach<T: Behavior>(
        &mut self,
        target: impl Into<Target>,
        behavior: T,
    ) -> Option<&mut T> {
        let registry = match self.resolve_target(target) {
            Target::Node(node) => self.scripts.entry(node).or_default(),
            target @ Target::Model(_) => self.slot_mut(target)?.registry_or_create(),
        };
        Some(registry.insert(behavior))
    }

    /// Attach a behaviour built from the owning node.
    pub fn attach_with<T: Behavior>(
        &mut self,
        target: impl Into<Target>,
        build: impl FnOnce(NodeId) -> T,
    ) -> Option<&mut T> {
        let target = target.into();
        let node = self.owner_node(target)?;
        self.attach(target, build(node))
    }

    pub fn script<T: Behavior>(&self, target: impl Into<Target>) -> Option<&T> {
        match self.resolve_target(target) {
            Target::Node(node) => self.scripts.get(&node)?.get::<T>(),
            Target::Model(id) => self.models.get(id.0)?.scripts.registry()?.get::<T>(),
        }
    }

    pub fn script_mut<T: Behavior>(&mut self, target: impl Into<Target>) -> Option<&mut T> {
        match self.resolve_target(target) {
            Target::Node(node) => self.scripts.get_mut(&node)?.get_mut::<T>(),
            target @ Target::Model(_) => self.slot_mut(target)?.registry_mut()?.get_mut::<T>(),
        }
    }

    /// Detach the behaviour of type `T` and say what happened.
    pub fn remove_script_outcome<T: Behavior>(
        &mut self,
        target: impl Into<Target>,
    ) -> RemoveOutcome {
        match self.resolve_target(target) {
            Target::Node(node) => match self.scripts.get_mut(&node) {
                None => RemoveOutcome::NoRegistry,
                Some(registry) => {
                    if registry.remove::<T>() {
                        RemoveOutcome::Removed
                    } else {
                        RemoveOutcome::Missing
                    }
                }
            },
            target @ Target::Model(_) => match self.slot_mut(target) {
                Some(slot) => slot.remove_outcome::<T>(),
                None => RemoveOutcome::NoRegistry,
            },
        }
    }

    /// Detach the behaviour of type `T`.
    ///
    /// Returns `false` only when the target has behaviours but none of type
    /// `T`; a target that never had any behaviour reports `true`.
    pub fn remove_script<T: Behavior>(&mut self, target: impl Into<Target>) -> bool {
        self.remove_script_outcome::<T>(target).as_bool()
    }

    /// Drop every behaviour on `target`. Returns whether it had any registry.
    pub fn clear_scripts(&mut self, target: impl Into<Target>) -> bool {
        match self.resolve_target(target) {
            Target::Node(node) => self.scripts.remove(&node).is_some(),
            target @ Target::Model(_) => self
                .slot_mut(target)
                .and_then(|slot| slot.take_registry())
                .is_some(),
        }
    }

    // ---- traversal --------------------------------------------------------

    fn visit(&mut self, scope: Scope, mut f: impl FnMut(&mut dyn Behavior, &mut SceneGraph)) {
        if scope == Scope::All {
            for id in &self.flushed {
                let Some(registry) = self.models.get_mut(id.0).and_then(|m| m.scripts.as_mut())
                else {
                    continue;
                };
                for behavior in registry.iter_mut() {
                    f(behavior, &mut self.graph);
                }
            }
        }

        for node in self.graph.descendants(self.graph.root()) {
            if let Some(registry) = self.scripts.get_mut(&node) {
                for behavior in registry.iter_mut() {
                    f(behavior, &mut self.graph);
                }
            }
        }
    }

    /// Run `awake` on behaviours of nodes under the root.
    pub fn awake_all(&mut self) {
        self.visit(Scope::Primitive, |b, graph| b.awake(graph));
    }

    /// Freeze every behaviour and run its `created` hook.
    pub fn created_all(&mut self) {
        self.visit(Scope::All, |b, graph| {
            b.base_mut().freeze();
            b.created(graph);
        });
    }

    pub fn debug_visuals_all(&mut self) {
        self.visit(Scope::All, |b, graph| b.debug_visual(graph));
    }

    /// One frame of behaviour updates. Each behaviour is thawed after its
    /// `render` returns.
    pub fn render_all(&mut self, time: f32, dt: f32) {
        self.visit(Scope::All, |b, graph| {
            b.render(graph, time, dt);
            b.base_mut().thaw();
        });
    }

    pub fn before_destroy_all(&mut self) {
        self.visit(Scope::All, |b, graph| b.before_destroy(graph));
    }

    /// Advance clip loops and players of flushed animated models.
    pub fn advance_animation(&mut self, dt: f32) {
        for id in &self.players {
            if let Some(model) = self.models.get_mut(id.0) {
                model.advance(dt, &mut self.graph);
            }
        }
    }

    /// Stop clip loops and drop every node, behaviour and model.
    pub(crate) fn teardown(&mut self) {
        for model in &mut self.models {
            model.cancel_loops();
        }
        self.graph.reset();
        self.scripts.clear();
        self.models.clear();
        self.pending.clear();
        self.flushed.clear();
        self.players.clear();
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::graph::{Aabb, Transform};
    use crate::model::{BoxFuture, Clip, MemoryLoader, ModelNode};
    use crate::script::ScriptBase;
    use glam::Vec3;
    use std::cell::RefCell;
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    type Log = Rc<RefCell<Vec<String>>>;

    struct Tracer {
        base: ScriptBase,
        label: &'static str,
        log: Log,
    }

    impl Tracer {
        fn new(node: NodeId, label: &'static str, log: &Log) -> Self {
            Self {
                base: ScriptBase::new(node),
                label,
                log: log.clone(),
            }
        }
    }

    impl Behavior for Tracer {
        fn base(&self) -> &ScriptBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut ScriptBase {
            &mut self.base
        }
        fn awake(&mut self, _graph: &mut SceneGraph) {
            self.log.borrow_mut().push(format!("awake {}", self.label));
        }
        fn render(&mut self, _graph: &mut SceneGraph, _time: f32, _dt: f32) {
            self.log.borrow_mut().push(format!("render {}", self.label));
        }
    }

    struct Other(ScriptBase);

    impl Behavior for Other {
        fn base(&self) -> &ScriptBase {
            &self.0
        }
        fn base_mut(&mut self) -> &mut ScriptBase {
            &mut self.0
        }
    }

    fn crate_payload() -> ModelData {
        ModelData::new(
            ModelNode::new("crate").child(
                ModelNode::new("lid").mesh(Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0))),
            ),
        )
    }

    #[test]
    fn nodes_insert_immediately_models_queue() {
        let mut stage = Stage::with_loader(MemoryLoader::new().with("crate.glb", crate_payload()));
        let node = stage.graph_mut().spawn("box");
        assert!(stage.add(node));
        assert_eq!(stage.graph().parent(node), Some(stage.root()));

        let id = stage.insert_model(ModelDesc::new("crate.glb"));
        assert!(stage.add(id));
        assert!(!stage.add(id));
        assert_eq!(stage.pending(), &[id]);
        let anchor = stage.model(id).unwrap().anchor();
        assert_eq!(stage.graph().parent(anchor), None);
    }

    #[test]
    fn queue_drains_exactly_once() {
        let mut stage = Stage::with_loader(MemoryLoader::new().with("crate.glb", crate_payload()));
        let id = stage.insert_model(ModelDesc::new("crate.glb"));
        stage.add(id);
        pollster::block_on(stage.load_model(id, None)).unwrap();

        assert_eq!(stage.flush(), 1);
        assert!(stage.pending().is_empty());
        assert_eq!(stage.flush(), 0);
        let root = stage.model(id).unwrap().root_node().unwrap();
        assert_eq!(stage.graph().children(stage.root()), vec![root]);
        assert!(!stage.add(id));
    }

    #[test]
    fn unloaded_models_are_dropped_from_queue() {
        let mut stage = Stage::new();
        let id = stage.insert_model(ModelDesc::new("missing.stl"));
        stage.add(id);
        assert_eq!(stage.flush(), 0);
        assert!(stage.pending().is_empty());
        assert!(stage.flushed().is_empty());
    }

    #[test]
    fn load_failure_propagates_and_is_tracked() {
        let mut stage = Stage::with_loader(MemoryLoader::new());
        let id = stage.insert_model(ModelDesc::new("nope.glb"));
        let err = pollster::block_on(stage.load_model(id, None)).unwrap_err();
        assert!(matches!(err, SceneError::Load(_)));
        assert!(stage.model(id).unwrap().root_node().is_none());
        assert_eq!(stage.tracker().errors().len(), 1);
    }

    #[test]
    fn supplied_payload_skips_loader() {
        let mut stage = Stage::with_loader(MemoryLoader::new());
        let id = stage.insert_model(ModelDesc::new("inline.glb").name("Inline"));
        pollster::block_on(stage.load_model(id, Some(crate_payload()))).unwrap();
        let root = stage.model(id).unwrap().root_node().unwrap();
        assert_eq!(stage.graph().name(root).as_deref(), Some("Inline"));
        assert_eq!(stage.tracker().total(), 0);
    }

    #[test]
    fn asset_root_prefixes_relative_paths() {
        let mut stage =
            Stage::with_loader(MemoryLoader::new().with("assets/crate.glb", crate_payload()));
        stage.set_asset_root(Some(PathBuf::from("assets")));
        let id = stage.insert_model(ModelDesc::new("crate.glb"));
        assert!(pollster::block_on(stage.load_model(id, None)).is_ok());
    }

    #[test]
    fn traversal_visits_models_first() {
        let log = Log::default();
        let mut stage = Stage::with_loader(MemoryLoader::new().with("crate.glb", crate_payload()));

        let a = stage.graph_mut().spawn("a");
        stage.add(a);
        let b = stage
            .graph_mut()
            .spawn_child(a, "b", Transform::new());
        stage.attach(b, Tracer::new(b, "b", &log));
        stage.attach(a, Tracer::new(a, "a", &log));

        let id = stage.insert_model(ModelDesc::new("crate.glb"));
        stage.attach_with(id, |node| Tracer::new(node, "model", &log));
        stage.add(id);
        pollster::block_on(stage.load_model(id, None)).unwrap();

        stage.awake_all();
        stage.flush();
        stage.render_all(0.0, 0.016);

        assert_eq!(
            *log.borrow(),
            vec![
                "awake a",
                "awake b",
                "render model",
                "render a",
                "render b"
            ]
        );
    }

    #[test]
    fn render_thaws_after_update() {
        let mut stage = Stage::new();
        let node = stage.graph_mut().spawn("n");
        stage.add(node);
        stage.attach(node, Other(ScriptBase::new(node)));

        stage.created_all();
        assert!(stage.script::<Other>(node).unwrap().base().is_frozen());
        stage.render_all(0.0, 0.016);
        assert!(!stage.script::<Other>(node).unwrap().base().is_frozen());
    }

    #[test]
    fn detached_nodes_are_not_visited() {
        let log = Log::default();
        let mut stage = Stage::new();
        let loose = stage.graph_mut().spawn("loose");
        stage.attach(loose, Tracer::new(loose, "loose", &log));
        stage.render_all(0.0, 0.016);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn remove_semantics() {
        let log = Log::default();
        let mut stage = Stage::new();
        let node = stage.graph_mut().spawn("n");

        assert_eq!(
            stage.remove_script_outcome::<Tracer>(node),
            RemoveOutcome::NoRegistry
        );
        assert!(stage.remove_script::<Tracer>(node));

        stage.attach(node, Other(ScriptBase::new(node)));
        assert!(!stage.remove_script::<Tracer>(node));
        stage.attach(node, Tracer::new(node, "p", &log));
        assert!(stage.remove_script::<Tracer>(node));
        assert!(stage.script::<Tracer>(node).is_none());
        assert!(stage.script::<Other>(node).is_some());

        assert!(stage.clear_scripts(node));
        assert!(!stage.clear_scripts(node));
    }

    #[test]
    fn model_scripts_have_their_own_registry() {
        let mut stage = Stage::new();
        let id = stage.insert_model(ModelDesc::new("ship.stl"));
        let anchor = stage.model(id).unwrap().anchor();

        assert_eq!(
            stage.remove_script_outcome::<Other>(id),
            RemoveOutcome::NoRegistry
        );
        let script = stage.attach_with(id, |node| Other(ScriptBase::new(node))).unwrap();
        assert_eq!(script.base().node(), anchor);
        assert!(stage.script::<Other>(id).is_some());
        assert!(stage.script::<Other>(anchor).is_none());
        assert!(stage.clear_scripts(id));

        assert!(stage.attach(AssetId(99), Other(ScriptBase::new(anchor))).is_none());
    }

    #[test]
    fn clone_model_copies_payload() {
        let mut stage = Stage::with_loader(MemoryLoader::new().with("crate.glb", crate_payload()));
        let id = stage.insert_model(ModelDesc::new("crate.glb").with_bounds());
        assert!(stage.clone_model(id, "copy", false).is_none());

        pollster::block_on(stage.load_model(id, None)).unwrap();
        let copy = stage.clone_model(id, "copy", false).unwrap();
        let model = stage.model(copy).unwrap();
        let root = model.root_node().unwrap();
        assert_ne!(root, stage.model(id).unwrap().anchor());
        assert_eq!(stage.graph().name(root).as_deref(), Some("copy"));
        assert!(model.bounding_volume().is_none());
        assert!(stage.graph().find_by_name(root, "lid").is_some());
    }

    #[test]
    fn flush_registers_players_and_teardown_cancels_loops() {
        let payload = crate_payload().with_clip(Clip::new("spin", 1.0));
        let mut stage = Stage::with_loader(MemoryLoader::new().with("crate.glb", payload));
        let id = stage.insert_model(ModelDesc::new("crate.glb").animated());
        stage.add(id);
        pollster::block_on(stage.load_model(id, None)).unwrap();
        stage.flush();

        let handle = stage
            .model_mut(id)
            .unwrap()
            .loop_clips(std::time::Duration::from_millis(500))
            .unwrap();
        stage.advance_animation(0.5);
        assert_eq!(stage.model(id).unwrap().selected_clip(), Some(0));

        stage.teardown();
        assert!(handle.is_cancelled());
        assert_eq!(stage.graph().len(), 1);
    }

    #[test]
    fn anchor_node_shares_model_registry() {
        let log = Log::default();
        let mut stage = Stage::with_loader(MemoryLoader::new().with("crate.glb", crate_payload()));
        let id = stage.insert_model(ModelDesc::new("crate.glb"));
        stage.attach_with(id, |node| Tracer::new(node, "via model", &log));
        stage.add(id);
        pollster::block_on(stage.load_model(id, None)).unwrap();
        stage.flush();

        let root = stage.model(id).unwrap().root_node().unwrap();
        stage.attach(root, Tracer::new(root, "via node", &log));
        assert_eq!(stage.model(id).unwrap().scripts().unwrap().len(), 1);
        assert!(stage.script::<Tracer>(root).is_some());

        stage.render_all(0.0, 0.016);
        assert_eq!(*log.borrow(), vec!["render via node"]);

        assert!(stage.remove_script::<Tracer>(root));
        assert!(stage.script::<Tracer>(id).is_none());
    }

    /// Returns `Pending` once before completing.
    struct YieldOnce(bool);

    impl Future for YieldOnce {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                Poll::Ready(())
            } else {
                self.0 = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    struct SlowLoader {
        inner: MemoryLoader,
        log: Log,
    }

    impl AssetLoader for SlowLoader {
        fn load<'a>(
            &'a self,
            path: &'a Path,
        ) -> BoxFuture<'a, std::result::Result<ModelData, LoadError>> {
            Box::pin(async move {
                self.log
                    .borrow_mut()
                    .push(format!("start {}", path.display()));
                YieldOnce(false).await;
                self.log.borrow_mut().push(format!("end {}", path.display()));
                self.inner.load(path).await
            })
        }
    }

    #[test]
    fn load_models_fetches_concurrently() {
        let log = Log::default();
        let mut stage = Stage::with_loader(SlowLoader {
            inner: MemoryLoader::new()
                .with("a.glb", crate_payload())
                .with("b.glb", crate_payload()),
            log: log.clone(),
        });
        let a = stage.insert_model(ModelDesc::new("a.glb"));
        let b = stage.insert_model(ModelDesc::new("b.glb"));

        pollster::block_on(stage.load_models(&[a, b])).unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["start a.glb", "start b.glb", "end a.glb", "end b.glb"]
        );
        assert!(stage.model(a).unwrap().is_loaded());
        assert!(stage.model(b).unwrap().is_loaded());
        assert_eq!(stage.tracker().loaded(), 2);
    }

    #[test]
    fn load_models_awaits_every_fetch_before_failing() {
        let mut stage = Stage::with_loader(MemoryLoader::new().with("b.glb", crate_payload()));
        let a = stage.insert_model(ModelDesc::new("a.glb"));
        let b = stage.insert_model(ModelDesc::new("b.glb"));

        let err = pollster::block_on(stage.load_models(&[a, b])).unwrap_err();
        assert!(matches!(err, SceneError::Load(LoadError::Io { .. })));
        assert!(!stage.model(a).unwrap().is_loaded());
        assert!(stage.model(b).unwrap().is_loaded());
        assert_eq!(stage.tracker().loaded(), 1);
        assert_eq!(stage.tracker().errors().len(), 1);

        let missing = pollster::block_on(stage.load_models(&[b, AssetId(7)])).unwrap_err();
        assert!(matches!(missing, SceneError::UnknownAsset(AssetId(7))));
    }

    #[test]
    fn teardown_drops_detached_nodes() {
        let mut stage = Stage::new();
        let loose = stage.graph_mut().spawn("loose");
        stage
            .graph_mut()
            .set_mesh(loose, Aabb::new(Vec3::ZERO, Vec3::ONE));
        let never_flushed = stage.insert_model(ModelDesc::new("ship.stl"));
        let anchor = stage.model(never_flushed).unwrap().anchor();

        stage.teardown();
        assert_eq!(stage.graph().len(), 1);
        assert!(!stage.graph().contains(loose));
        assert!(!stage.graph().contains(anchor));
    }
}
