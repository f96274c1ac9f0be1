//! Shell Lifecycle Integration Tests
//!
//! These tests drive whole scenes through the public API and check the order
//! in which hooks fire.
//!
//! # Test Categories
//!
//! 1. **Lifecycle order** - mount, awake, load, created, debug visuals, frames, teardown
//! 2. **Traversal** - every behaviour once per frame, models first
//! 3. **Failure paths** - failed loads and stale load completions
//! 4. **Scene switching** - old shell fully torn down before the new one mounts

use std::cell::RefCell;
use std::rc::Rc;

use stagehand::{
    AssetId, Behavior, BoxFuture, FollowCamera, HeadlessRenderer, LoadError, MemoryLoader,
    ModelData, ModelDesc, ModelNode, NodeId, RenderStats, Result, Scene, SceneError,
    SceneGraph, SceneSelector, ScriptBase, Shell, ShellConfig, ShellState, Stage, Transform,
    Vec3,
};

// =============================================================================
// Helpers
// =============================================================================

type Log = Rc<RefCell<Vec<String>>>;

fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

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

    fn push(&self, hook: &str) {
        self.log.borrow_mut().push(format!("{} {}", hook, self.label));
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
        self.push("awake");
    }
    fn created(&mut self, _graph: &mut SceneGraph) {
        self.push("created");
    }
    fn render(&mut self, _graph: &mut SceneGraph, _time: f32, _dt: f32) {
        self.push("render");
    }
    fn before_destroy(&mut self, _graph: &mut SceneGraph) {
        self.push("destroy");
    }
    fn debug_visual(&mut self, _graph: &mut SceneGraph) {
        self.push("debug");
    }
}

/// A node `a` with child `b`, both traced, and one traced model.
struct Recorder {
    log: Log,
    model: Option<AssetId>,
}

impl Recorder {
    fn new(log: &Log) -> Self {
        Self {
            log: log.clone(),
            model: None,
        }
    }
}

impl Scene for Recorder {
    fn mounted(&mut self, stage: &mut Stage) {
        self.log.borrow_mut().push("scene mounted".into());
        let root = stage.root();
        let a = stage.graph_mut().spawn_child(root, "a", Transform::new());
        let b = stage.graph_mut().spawn_child(a, "b", Transform::new());
        stage.attach(a, Tracer::new(a, "a", &self.log));
        stage.attach(b, Tracer::new(b, "b", &self.log));

        let model = stage.insert_model(ModelDesc::new("robot.glb"));
        let log = self.log.clone();
        stage.attach_with(model, |node| Tracer::new(node, "model", &log));
        stage.add(model);
        self.model = Some(model);
    }

    fn load<'a>(&'a mut self, stage: &'a mut Stage) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.log.borrow_mut().push("scene load".into());
            if let Some(model) = self.model {
                stage.load_model(model, None).await?;
            }
            Ok(())
        })
    }

    fn frame(&mut self, _stage: &mut Stage, _time: f32, _dt: f32) {
        self.log.borrow_mut().push("scene frame".into());
    }

    fn before_destroy(&mut self, _stage: &mut Stage) {
        self.log.borrow_mut().push("scene destroy".into());
    }
}

fn robot() -> MemoryLoader {
    MemoryLoader::new().with(
        "robot.glb",
        ModelData::new(ModelNode::new("robot").child(ModelNode::new("body"))),
    )
}

fn config() -> ShellConfig {
    ShellConfig::new().fixed_step(1.0 / 30.0)
}

// =============================================================================
// Lifecycle order
// =============================================================================

#[test]
fn hooks_fire_in_lifecycle_order() {
    let log = Log::default();
    let mut shell =
        Shell::new(config().debug_visuals(true), Recorder::new(&log)).with_loader(robot());

    shell.start().unwrap();
    assert_eq!(shell.run_frames(1), 1);
    shell.destroy();

    assert_eq!(
        entries(&log),
        vec![
            "scene mounted",
            "awake a",
            "awake b",
            "scene load",
            "created model",
            "created a",
            "created b",
            "debug model",
            "debug a",
            "debug b",
            "render model",
            "render a",
            "render b",
            "scene frame",
            "scene destroy",
            "destroy model",
            "destroy a",
            "destroy b",
        ]
    );
}

#[test]
fn debug_visuals_are_opt_in() {
    let log = Log::default();
    let mut shell = Shell::new(config(), Recorder::new(&log)).with_loader(robot());
    shell.start().unwrap();
    assert!(!entries(&log).iter().any(|e| e.starts_with("debug")));
}

#[test]
fn model_joins_tree_only_after_load() {
    let log = Log::default();
    let mut shell = Shell::new(config(), Recorder::new(&log)).with_loader(robot());
    shell.mount().unwrap();

    let stage = shell.stage();
    let id = stage.pending()[0];
    assert!(stage.model(id).unwrap().root_node().is_none());

    let ticket = pollster::block_on(shell.load()).unwrap();
    assert_eq!(shell.stage().pending().len(), 1);
    assert!(shell.complete_load(ticket));

    let stage = shell.stage();
    assert!(stage.pending().is_empty());
    let root = stage.model(id).unwrap().root_node().unwrap();
    assert_eq!(stage.graph().parent(root), Some(stage.root()));
}

// =============================================================================
// Traversal
// =============================================================================

#[test]
fn every_behaviour_once_per_frame_models_first() {
    let log = Log::default();
    let mut shell = Shell::new(config(), Recorder::new(&log)).with_loader(robot());
    shell.start().unwrap();
    log.borrow_mut().clear();

    shell.run_frames(2);
    let renders: Vec<String> = entries(&log)
        .into_iter()
        .filter(|e| e.starts_with("render"))
        .collect();
    assert_eq!(
        renders,
        vec![
            "render model",
            "render a",
            "render b",
            "render model",
            "render a",
            "render b",
        ]
    );
}

#[test]
fn renderer_sees_every_frame() {
    let log = Log::default();
    let renderer = HeadlessRenderer::new();
    let stats = renderer.stats();
    let mut shell =
        Shell::with_renderer(config(), Recorder::new(&log), renderer).with_loader(robot());
    shell.start().unwrap();
    shell.run_frames(5);

    // root, a, b, model anchor, body
    assert_eq!(stats.borrow().frames, 5);
    assert_eq!(stats.borrow().visible_nodes, 5);

    shell.destroy();
    assert!(stats.borrow().disposed);
    assert_eq!(shell.stage().graph().len(), 1);
}

#[test]
fn follow_camera_tracks_a_mounted_node() {
    let log = Log::default();
    let mut shell = Shell::new(config(), Recorder::new(&log)).with_loader(robot());
    shell.start().unwrap();

    let stage = shell.stage_mut();
    let root = stage.root();
    let a = stage.graph().find_by_name(root, "a").unwrap();
    stage.graph_mut().transform_mut(a).unwrap().position = Vec3::new(4.0, 0.0, 0.0);

    shell.set_controller(FollowCamera::new(a));
    shell.run_frames(1);

    let camera = shell.camera();
    assert_eq!(camera.position, Vec3::new(4.0, 2.0, -5.0));
    assert!(camera.forward.z > 0.0);
}

// =============================================================================
// Failure paths
// =============================================================================

#[test]
fn missing_asset_fails_the_shell() {
    let log = Log::default();
    let mut shell =
        Shell::new(config(), Recorder::new(&log)).with_loader(MemoryLoader::new());

    let err = shell.start().unwrap_err();
    assert!(matches!(err, SceneError::Load(LoadError::Io { .. })));
    assert_eq!(shell.state(), ShellState::Failed);
    assert!(shell.failure().is_some());
    assert_eq!(shell.run_frames(3), 0);
    assert!(!entries(&log).iter().any(|e| e.starts_with("created")));

    shell.destroy();
    assert_eq!(shell.state(), ShellState::Destroyed);
}

#[test]
fn completing_after_teardown_is_a_noop() {
    let log = Log::default();
    let mut shell = Shell::new(config(), Recorder::new(&log)).with_loader(robot());
    shell.mount().unwrap();
    let ticket = pollster::block_on(shell.load()).unwrap();

    shell.destroy();
    assert!(!shell.complete_load(ticket));
    assert!(!entries(&log).iter().any(|e| e.starts_with("created")));
    assert_eq!(shell.run_frames(1), 0);
}

// =============================================================================
// Scene switching
// =============================================================================

#[test]
fn switching_tears_down_before_mounting() {
    let log = Log::default();
    let renderers: Rc<RefCell<Vec<Rc<RefCell<RenderStats>>>>> = Rc::default();

    let mut selector = SceneSelector::new();
    for name in ["first", "second"] {
        let log = log.clone();
        let renderers = renderers.clone();
        selector.register(name, move || {
            log.borrow_mut().push(format!("build {}", name));
            let renderer = HeadlessRenderer::new();
            renderers.borrow_mut().push(renderer.stats());
            Shell::with_renderer(config().title(name), Recorder::new(&log), renderer)
                .with_loader(robot())
        });
    }

    selector.select("first").unwrap().run_frames(1);
    log.borrow_mut().clear();

    let second = selector.select("second").unwrap();
    assert!(second.is_running());

    let log = entries(&log);
    let build = log.iter().position(|e| e == "build second").unwrap();
    let teardown: Vec<&str> = log[..build].iter().map(String::as_str).collect();
    assert_eq!(
        teardown,
        vec!["scene destroy", "destroy model", "destroy a", "destroy b"]
    );
    assert_eq!(log[build + 1], "scene mounted");

    let renderers = renderers.borrow();
    assert!(renderers[0].borrow().disposed);
    assert!(!renderers[1].borrow().disposed);
}
