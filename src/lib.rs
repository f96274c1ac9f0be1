//! # Stagehand
//!
//! **Scene lifecycle, attachable behaviours and composite models on a small
//! scene graph.**
//!
//! Write a [`Scene`], hand it to a [`Shell`], and the shell mounts it, loads
//! its models, splices them into the graph and then drives every attached
//! behaviour once per frame until teardown.
//!
//! ## Quick Start
//!
//! ```
//! use stagehand::*;
//!
//! struct Spin {
//!     base: ScriptBase,
//! }
//!
//! impl Behavior for Spin {
//!     fn base(&self) -> &ScriptBase {
//!         &self.base
//!     }
//!     fn base_mut(&mut self) -> &mut ScriptBase {
//!         &mut self.base
//!     }
//!     fn render(&mut self, graph: &mut SceneGraph, _time: f32, dt: f32) {
//!         if let Some(t) = graph.transform_mut(self.base.node()) {
//!             t.rotate_y(dt);
//!         }
//!     }
//! }
//!
//! struct Demo;
//!
//! impl Scene for Demo {
//!     fn mounted(&mut self, stage: &mut Stage) {
//!         let cube = stage.graph_mut().spawn("cube");
//!         stage.add(cube);
//!         stage.attach(cube, Spin { base: ScriptBase::new(cube) });
//!     }
//! }
//!
//! let mut shell = Shell::new(ShellConfig::new().fixed_step(1.0 / 60.0), Demo);
//! shell.start().unwrap();
//! shell.run_frames(60);
//! shell.destroy();
//! ```
//!
//! ## Pieces
//!
//! - [`SceneGraph`]: nodes with transforms, names and mesh bounds, stored in a
//!   `hecs` world
//! - [`Behavior`]: lifecycle hooks attached to nodes or models, one per type
//! - [`Model`]: a loaded multi-node asset, optionally animated
//! - [`Stage`]: the graph plus behaviours and models, with uniform `add`
//! - [`Shell`]: the lifecycle driver; [`SceneSelector`] switches between shells
//! - [`OrbitCamera`] and [`FollowCamera`]: camera controllers run after each frame

mod app;
mod camera;
pub mod error;
mod follow_camera;
pub mod graph;
pub mod model;
mod orbit_camera;
pub mod progress;
mod renderer;
pub mod scene;
pub mod script;
mod stage;

pub use app::{ClockMode, LoadTicket, Shell, ShellConfig, ShellState};
pub use camera::{Camera, CameraController};
pub use error::{LoadError, Result, SceneError};
pub use follow_camera::FollowCamera;
pub use graph::{Aabb, BoundsHelper, MeshBounds, NodeId, SceneGraph, Transform};
pub use model::{
    AssetId, AssetLoader, BoxFuture, Clip, ClipLoopHandle, ClipPlayer, MemoryLoader, Model,
    ModelData, ModelDesc, ModelNode, StlLoader, Track,
};
pub use orbit_camera::{OrbitCamera, OrbitMode};
pub use progress::{LoadTracker, ProgressBoard};
pub use renderer::{HeadlessRenderer, RenderStats, Renderer};
pub use scene::{Scene, SceneId, SceneSelector};
pub use script::{
    AsAny, Behavior, BoxCollider, ComponentRegistry, Contact, RemoveOutcome, ScriptBase,
    ScriptId, Seek,
};
pub use stage::{SceneItem, Stage, Target};

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec3};
