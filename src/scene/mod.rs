//! Scene hooks and scene switching.
//!
//! A [`Scene`] is application code: it builds the stage when mounted, loads
//! what it needs, and reacts to frames. A [`Shell`](crate::Shell) runs one
//! scene through its lifecycle. The [`SceneSelector`] owns the shell that is
//! currently running and swaps it for another on request, tearing the old one
//! down completely before the new one is built.
//!
//! # Example
//!
//! ```
//! use stagehand::{Scene, SceneSelector, Shell, ShellConfig, Stage};
//!
//! struct Title;
//! impl Scene for Title {}
//!
//! struct Level;
//! impl Scene for Level {
//!     fn frame(&mut self, stage: &mut Stage, _time: f32, _dt: f32) {
//!         let _ = stage.graph().len();
//!     }
//! }
//!
//! let mut selector = SceneSelector::new();
//! selector.register("title", || Shell::new(ShellConfig::new().fixed_step(1.0 / 60.0), Title));
//! selector.register("level", || Shell::new(ShellConfig::new().fixed_step(1.0 / 60.0), Level));
//!
//! selector.select("title");
//! if let Some(shell) = selector.select("level") {
//!     shell.run_frames(10);
//! }
//! ```

pub mod scene;
mod selector;

pub use scene::{Scene, SceneId};
pub use selector::SceneSelector;
