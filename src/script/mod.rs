//! Attachable behaviour scripts.
//!
//! A behaviour is a value implementing [`Behavior`] that is attached to a
//! scene node (or to a loaded model) through the [`Stage`](crate::Stage).
//! At most one behaviour of each concrete type lives on a node; the stage
//! calls its lifecycle hooks in a fixed order:
//!
//! 1. [`awake`](Behavior::awake) once, before the scene loads its assets
//!    (primitive nodes only, since models are not in the tree yet)
//! 2. [`created`](Behavior::created) once, after loaded models are spliced in
//! 3. [`debug_visual`](Behavior::debug_visual) once, when debug visuals are on
//! 4. [`render`](Behavior::render) every frame
//! 5. [`before_destroy`](Behavior::before_destroy) when the shell tears down
//!
//! # Example
//!
//! ```
//! use stagehand::{Behavior, SceneGraph, ScriptBase};
//!
//! struct Spin {
//!     base: ScriptBase,
//!     speed: f32,
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
//!             t.rotate_y(self.speed * dt);
//!         }
//!     }
//! }
//! ```

pub mod collider;
pub mod motion;
pub mod registry;

pub use collider::{BoxCollider, Contact};
pub use motion::{Seek, seek_to_target};
pub use registry::{ComponentRegistry, RemoveOutcome};

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;

use crate::graph::{NodeId, SceneGraph};

static NEXT_SCRIPT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier handed to every behaviour at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptId(u64);

impl ScriptId {
    fn next() -> Self {
        Self(NEXT_SCRIPT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// State every behaviour carries: its id, the node it belongs to, and the
/// freeze flag.
///
/// The freeze flag is set when the behaviour is constructed and again right
/// before `created` runs, and is cleared by the stage after the behaviour's
/// first `render`. Behaviours use it to ignore stale state during the first
/// frame (see [`BoxCollider`]).
#[derive(Clone, Debug)]
pub struct ScriptBase {
    id: ScriptId,
    node: NodeId,
    frozen: bool,
}

impl ScriptBase {
    pub fn new(node: NodeId) -> Self {
        Self {
            id: ScriptId::next(),
            node,
            frozen: true,
        }
    }

    pub fn id(&self) -> ScriptId {
        self.id
    }

    /// The node this behaviour drives.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn thaw(&mut self) {
        self.frozen = false;
    }

    /// Step the owning node toward `target`. See [`seek_to_target`].
    ///
    /// Returns `true` once the node has arrived, and also when the node does
    /// not exist (there is nothing left to move).
    pub fn seek(&self, graph: &mut SceneGraph, target: Vec3, dt: f32, seek: Seek) -> bool {
        match graph.transform_mut(self.node) {
            Some(transform) => seek_to_target(transform, target, dt, seek),
            None => true,
        }
    }
}

/// Upcasting helper so registries can hand back concrete behaviour types.
///
/// Implemented for every `'static` type; never implement it by hand.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Lifecycle hooks of an attachable behaviour. Every hook defaults to a no-op.
///
/// Hooks receive the scene graph so they can read and move nodes. They cannot
/// attach or remove behaviours while the stage is traversing.
pub trait Behavior: AsAny {
    fn base(&self) -> &ScriptBase;

    fn base_mut(&mut self) -> &mut ScriptBase;

    /// Runs before the scene loads its assets.
    fn awake(&mut self, _graph: &mut SceneGraph) {}

    /// Runs once after loaded models have been inserted into the tree.
    fn created(&mut self, _graph: &mut SceneGraph) {}

    /// Per-frame update. `time` is seconds since the loop started and `dt`
    /// the seconds since the previous frame.
    fn render(&mut self, _graph: &mut SceneGraph, _time: f32, _dt: f32) {}

    /// Runs when the shell tears down, before any resource is released.
    fn before_destroy(&mut self, _graph: &mut SceneGraph) {}

    /// Add debug helpers to the scene.
    fn debug_visual(&mut self, _graph: &mut SceneGraph) {}
}
