//! Headless demo: runs two scenes back to back and logs what happens.
//!
//! ```sh
//! RUST_LOG=debug cargo run -- --frames 240 --model assets/ship.stl
//! ```

use std::path::PathBuf;

use clap::Parser;
use glam::Vec3;

use stagehand::{
    Aabb, AssetId, Behavior, BoxCollider, BoxFuture, FollowCamera, ModelDesc, NodeId,
    OrbitCamera, OrbitMode,
    Result, Scene, SceneGraph, SceneSelector, ScriptBase, Seek, Shell, ShellConfig, Stage,
    Transform,
};

#[derive(Parser)]
#[command(version, about = "Runs the stagehand demo scenes without a window")]
struct Cli {
    /// Frames to run in each scene.
    #[arg(long, default_value_t = 120)]
    frames: u64,

    /// Simulated frames per second.
    #[arg(long, default_value_t = 60.0)]
    fps: f32,

    /// STL model to place on the turntable.
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Add bounding-box helpers after loading.
    #[arg(long)]
    debug_visuals: bool,
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

/// Spins its node and bobs it along one axis.
struct Rotate {
    base: ScriptBase,
    axis: Axis,
}

impl Rotate {
    fn new(node: NodeId, axis: Axis) -> Self {
        Self {
            base: ScriptBase::new(node),
            axis,
        }
    }
}

impl Behavior for Rotate {
    fn base(&self) -> &ScriptBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ScriptBase {
        &mut self.base
    }

    fn render(&mut self, graph: &mut SceneGraph, time: f32, dt: f32) {
        if let Some(t) = graph.transform_mut(self.base.node()) {
            t.rotate_y(dt);
            match self.axis {
                Axis::X => t.position.x = time.sin(),
                Axis::Y => t.position.y = time.sin(),
            }
        }
    }
}

/// Walks between waypoints.
struct Patrol {
    base: ScriptBase,
    waypoints: Vec<Vec3>,
    next: usize,
    seek: Seek,
}

impl Behavior for Patrol {
    fn base(&self) -> &ScriptBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ScriptBase {
        &mut self.base
    }

    fn render(&mut self, graph: &mut SceneGraph, _time: f32, dt: f32) {
        let Some(target) = self.waypoints.get(self.next).copied() else {
            return;
        };
        if self.base.seek(graph, target, dt, self.seek) {
            log::debug!("patrol reached waypoint {}", self.next);
            self.next = (self.next + 1) % self.waypoints.len();
        }
    }
}

struct Turntable {
    model_path: Option<PathBuf>,
    model: Option<AssetId>,
}

impl Scene for Turntable {
    fn mounted(&mut self, stage: &mut Stage) {
        let root = stage.root();
        let left = stage.graph_mut().spawn_child(
            root,
            "left",
            Transform::from_position(Vec3::new(-2.0, 0.0, 0.0)),
        );
        let right = stage.graph_mut().spawn_child(
            root,
            "right",
            Transform::from_position(Vec3::new(2.0, 0.0, 0.0)),
        );
        stage.attach(left, Rotate::new(left, Axis::X));
        stage.attach(right, Rotate::new(right, Axis::Y));

        if let Some(path) = &self.model_path {
            let model = stage.insert_model(
                ModelDesc::new(path)
                    .name("turntable-model")
                    .with_bounds(),
            );
            stage.attach_with(model, |node| Rotate::new(node, Axis::Y));
            stage.add(model);
            self.model = Some(model);
        }
    }

    fn load<'a>(&'a mut self, stage: &'a mut Stage) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if let Some(model) = self.model {
                stage.load_model(model, None).await?;
            }
            Ok(())
        })
    }
}

struct Courtyard {
    walker: Option<NodeId>,
    beacon: Option<NodeId>,
}

impl Scene for Courtyard {
    fn mounted(&mut self, stage: &mut Stage) {
        let root = stage.root();
        let unit = Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5));

        let walker = stage.graph_mut().spawn_child(root, "walker", Transform::new());
        stage.graph_mut().set_mesh(walker, unit);
        stage.attach(
            walker,
            Patrol {
                base: ScriptBase::new(walker),
                waypoints: vec![
                    Vec3::new(4.0, 0.0, 0.0),
                    Vec3::new(0.0, 0.0, 4.0),
                    Vec3::ZERO,
                ],
                next: 0,
                seek: Seek::new(2.0).turn_blend(0.2),
            },
        );
        stage.attach(walker, BoxCollider::new(walker));

        let beacon = stage.graph_mut().spawn_child(
            root,
            "beacon",
            Transform::from_position(Vec3::new(4.0, 0.0, 0.0)),
        );
        stage.graph_mut().set_mesh(beacon, unit);
        stage.attach(beacon, BoxCollider::new(beacon));

        self.walker = Some(walker);
        self.beacon = Some(beacon);
    }

    fn frame(&mut self, stage: &mut Stage, time: f32, _dt: f32) {
        let (Some(walker), Some(beacon)) = (self.walker, self.beacon) else {
            return;
        };
        let beacon_box = stage.script::<BoxCollider>(beacon).and_then(|c| c.aabb());
        if let Some(collider) = stage.script_mut::<BoxCollider>(walker) {
            collider.intersects(beacon_box);
            if collider.trigger_enter() {
                log::info!("walker reached the beacon at t={:.2}s", time);
            }
            if collider.trigger_exit() {
                log::info!("walker left the beacon at t={:.2}s", time);
            }
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = ShellConfig::new()
        .size(1280, 720)
        .fixed_step(1.0 / cli.fps.max(1.0))
        .debug_visuals(cli.debug_visuals);

    let mut selector = SceneSelector::new();
    {
        let config = config.clone().title("turntable");
        let model_path = cli.model.clone();
        selector.register("turntable", move || {
            Shell::new(
                config.clone(),
                Turntable {
                    model_path: model_path.clone(),
                    model: None,
                },
            )
            .with_controller(
                OrbitCamera::new()
                    .distance(8.0)
                    .mode(OrbitMode::AutoRotate { speed: 0.5 }),
            )
        });
    }
    {
        let config = config.clone().title("courtyard");
        selector.register("courtyard", move || {
            Shell::new(
                config.clone(),
                Courtyard {
                    walker: None,
                    beacon: None,
                },
            )
        });
    }

    for id in ["turntable", "courtyard"] {
        let Some(shell) = selector.select(id) else {
            continue;
        };
        if let Some(error) = shell.failure() {
            log::error!("skipping '{}': {}", id, error);
            continue;
        }
        let stage = shell.stage();
        if let Some(walker) = stage.graph().find_by_name(stage.root(), "walker") {
            shell.set_controller(FollowCamera::new(walker).look_offset(Vec3::Y));
        }
        let ran = shell.run_frames(cli.frames);
        log::info!(
            "'{}' ran {} frame(s), {} node(s), camera at {:?}",
            id,
            ran,
            shell.stage().graph().len(),
            shell.camera().position
        );
    }
    selector.clear();
}
