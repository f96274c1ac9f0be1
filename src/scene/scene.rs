//! Scene hooks and identifier types.

use crate::error::Result;
use crate::model::BoxFuture;
use crate::stage::Stage;

/// Key a shell factory is registered under in a
/// [`SceneSelector`](super::SceneSelector), also used as the scene's name in
/// log lines.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SceneId(String);

impl SceneId {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SceneId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for SceneId {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Application code for one scene, driven by a [`Shell`](crate::Shell).
///
/// Every hook has a default, so a scene only implements what it needs.
///
/// # Example
///
/// ```
/// use stagehand::{BoxFuture, ModelDesc, Result, Scene, Stage};
///
/// struct Hangar {
///     ship: Option<stagehand::AssetId>,
/// }
///
/// impl Scene for Hangar {
///     fn mounted(&mut self, stage: &mut Stage) {
///         let ship = stage.insert_model(ModelDesc::new("ship.stl").with_bounds());
///         stage.add(ship);
///         self.ship = Some(ship);
///     }
///
///     fn load<'a>(&'a mut self, stage: &'a mut Stage) -> BoxFuture<'a, Result<()>> {
///         Box::pin(async move {
///             if let Some(ship) = self.ship {
///                 stage.load_model(ship, None).await?;
///             }
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Scene {
    /// Build the scene: spawn nodes, create models, attach behaviours.
    fn mounted(&mut self, _stage: &mut Stage) {}

    /// Fetch whatever the scene needs before its first frame.
    fn load<'a>(&'a mut self, _stage: &'a mut Stage) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Runs at the end of every frame, after behaviours and the renderer.
    fn frame(&mut self, _stage: &mut Stage, _time: f32, _dt: f32) {}

    /// Runs first during teardown, while everything is still alive.
    fn before_destroy(&mut self, _stage: &mut Stage) {}
}
