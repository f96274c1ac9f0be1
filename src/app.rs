use std::path::PathBuf;
use std::time::Instant;

use crate::camera::{Camera, CameraController};
use crate::error::{Result, SceneError};
use crate::model::AssetLoader;
use crate::renderer::{HeadlessRenderer, Renderer};
use crate::scene::Scene;
use crate::stage::Stage;

/// How the shell measures time between frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClockMode {
    /// Wall-clock time.
    Realtime,
    /// Every frame advances by the same number of seconds.
    FixedStep(f32),
}

#[derive(Debug)]
struct Clock {
    mode: ClockMode,
    start_time: Option<Instant>,
    last_frame: Option<Instant>,
    elapsed: f32,
}

impl Clock {
    fn new(mode: ClockMode) -> Self {
        Self {
            mode,
            start_time: None,
            last_frame: None,
            elapsed: 0.0,
        }
    }

    fn start(&mut self) {
        let now = Instant::now();
        self.start_time = Some(now);
        self.last_frame = Some(now);
        self.elapsed = 0.0;
    }

    /// Returns `(time, dt)` in seconds.
    fn tick(&mut self) -> (f32, f32) {
        match self.mode {
            ClockMode::FixedStep(step) => {
                self.elapsed += step;
                (self.elapsed, step)
            }
            ClockMode::Realtime => {
                let now = Instant::now();
                let start_time = *self.start_time.get_or_insert(now);
                let last_frame = self.last_frame.replace(now).unwrap_or(now);
                let time = now.duration_since(start_time).as_secs_f32();
                let dt = now.duration_since(last_frame).as_secs_f32();
                self.elapsed = time;
                (time, dt)
            }
        }
    }
}

/// Settings for a [`Shell`].
#[derive(Clone, Debug)]
pub struct ShellConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Clear colour, RGBA.
    pub background: [f32; 4],
    /// Run every behaviour's `debug_visual` hook after loading.
    pub debug_visuals: bool,
    pub clock: ClockMode,
    /// Directory relative model paths are resolved against.
    pub asset_root: Option<PathBuf>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            title: "Stagehand".to_string(),
            width: 800,
            height: 600,
            background: [0.0, 0.0, 0.0, 1.0],
            debug_visuals: false,
            clock: ClockMode::Realtime,
            asset_root: None,
        }
    }
}

impl ShellConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn background(mut self, rgba: [f32; 4]) -> Self {
        self.background = rgba;
        self
    }

    pub fn debug_visuals(mut self, enabled: bool) -> Self {
        self.debug_visuals = enabled;
        self
    }

    pub fn clock(mut self, clock: ClockMode) -> Self {
        self.clock = clock;
        self
    }

    /// Shorthand for a [`ClockMode::FixedStep`] clock.
    pub fn fixed_step(self, dt: f32) -> Self {
        self.clock(ClockMode::FixedStep(dt))
    }

    pub fn asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = Some(root.into());
        self
    }
}

/// Where a shell is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShellState {
    Constructed,
    Mounted,
    Loading,
    Running,
    /// Loading failed; see [`Shell::failure`].
    Failed,
    Destroyed,
}

impl ShellState {
    pub fn name(self) -> &'static str {
        match self {
            ShellState::Constructed => "constructed",
            ShellState::Mounted => "mounted",
            ShellState::Loading => "loading",
            ShellState::Running => "running",
            ShellState::Failed => "failed",
            ShellState::Destroyed => "destroyed",
        }
    }
}

/// Proof that a load phase finished, stamped with the shell generation it
/// started in. Pass it to [`Shell::complete_load`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

/// Owns one scene and drives it through its lifecycle:
///
/// 1. construction: camera, renderer surface, clock
/// 2. [`mount`](Self::mount): the scene's `mounted` hook, then `awake` on
///    every behaviour under the root
/// 3. [`load`](Self::load): the scene's async `load` hook
/// 4. [`complete_load`](Self::complete_load): flush queued models, `created`
///    on every behaviour, optional debug visuals, start the clock
/// 5. [`frame`](Self::frame), repeatedly
/// 6. [`destroy`](Self::destroy)
///
/// [`start`](Self::start) runs steps 2 to 4, blocking on the load.
pub struct Shell {
    config: ShellConfig,
    scene: Box<dyn Scene>,
    stage: Stage,
    renderer: Box<dyn Renderer>,
    camera: Camera,
    controller: Option<Box<dyn CameraController>>,
    clock: Clock,
    state: ShellState,
    failure: Option<String>,
    generation: u64,
    frames: u64,
}

impl Shell {
    /// A shell drawing with a [`HeadlessRenderer`].
    pub fn new(config: ShellConfig, scene: impl Scene + 'static) -> Self {
        Self::with_renderer(config, scene, HeadlessRenderer::new())
    }

    pub fn with_renderer(
        config: ShellConfig,
        scene: impl Scene + 'static,
        renderer: impl Renderer + 'static,
    ) -> Self {
        let mut renderer: Box<dyn Renderer> = Box::new(renderer);
        renderer.attach(config.width, config.height, config.background);

        let mut camera = Camera::new();
        camera.resize(config.width, config.height);

        let mut stage = Stage::new();
        stage.set_asset_root(config.asset_root.clone());

        log::info!("shell '{}' constructed", config.title);
        Self {
            clock: Clock::new(config.clock),
            config,
            scene: Box::new(scene),
            stage,
            renderer,
            camera,
            controller: None,
            state: ShellState::Constructed,
            failure: None,
            generation: 0,
            frames: 0,
        }
    }

    /// Use `loader` for every model this shell's stage loads.
    pub fn with_loader(mut self, loader: impl AssetLoader + 'static) -> Self {
        self.stage.set_loader(loader);
        self
    }

    pub fn with_controller(mut self, controller: impl CameraController + 'static) -> Self {
        self.controller = Some(Box::new(controller));
        self
    }

    /// Replace the camera controller, for controllers that need nodes the
    /// scene only creates when mounted.
    pub fn set_controller(&mut self, controller: impl CameraController + 'static) {
        self.controller = Some(Box::new(controller));
    }

    pub fn with_camera(mut self, mut camera: Camera) -> Self {
        camera.resize(self.config.width, self.config.height);
        self.camera = camera;
        self
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn state(&self) -> ShellState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ShellState::Running
    }

    /// The error that stopped loading, if any.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Frames driven since the loop started.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn set_state(&mut self, state: ShellState) {
        log::info!(
            "shell '{}': {} -> {}",
            self.config.title,
            self.state.name(),
            state.name()
        );
        self.state = state;
    }

    fn expect_state(&self, expected: ShellState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SceneError::InvalidState {
                expected: expected.name(),
                found: self.state.name(),
            })
        }
    }

    /// Run the scene's `mounted` hook, then `awake` on behaviours under the
    /// root.
    pub fn mount(&mut self) -> Result<()> {
        self.expect_state(ShellState::Constructed)?;
        self.scene.mounted(&mut self.stage);
        self.stage.awake_all();
        self.set_state(ShellState::Mounted);
        Ok(())
    }

    /// Run the scene's `load` hook.
    ///
    /// On failure the shell moves to [`ShellState::Failed`] and the error is
    /// returned unchanged.
    pub async fn load(&mut self) -> Result<LoadTicket> {
        self.expect_state(ShellState::Mounted)?;
        self.set_state(ShellState::Loading);
        let ticket = LoadTicket {
            generation: self.generation,
        };

        match self.scene.load(&mut self.stage).await {
            Ok(()) => Ok(ticket),
            Err(e) => {
                log::error!("scene '{}' failed to load: {}", self.config.title, e);
                self.failure = Some(e.to_string());
                self.set_state(ShellState::Failed);
                Err(e)
            }
        }
    }

    /// Finish a load: flush queued models, run `created` (and `debug_visual`
    /// when enabled), and start the clock.
    ///
    /// A ticket from before the last teardown, or a shell that is no longer
    /// loading, makes this a no-op returning `false`.
    pub fn complete_load(&mut self, ticket: LoadTicket) -> bool {
        if ticket.generation != self.generation || self.state != ShellState::Loading {
            log::warn!(
                "ignoring stale load completion for '{}' (state {})",
                self.config.title,
                self.state.name()
            );
            return false;
        }

        self.stage.flush();
        self.stage.created_all();
        if self.config.debug_visuals {
            self.stage.debug_visuals_all();
        }
        self.clock.start();
        self.set_state(ShellState::Running);
        true
    }

    /// Mount, load (blocking) and complete the load.
    pub fn start(&mut self) -> Result<()> {
        self.mount()?;
        let ticket = pollster::block_on(self.load())?;
        self.complete_load(ticket);
        Ok(())
    }

    /// Drive one frame. Returns `false` without doing anything unless the
    /// shell is running.
    pub fn frame(&mut self) -> bool {
        if self.state != ShellState::Running {
            return false;
        }
        let (time, dt) = self.clock.tick();

        self.stage.render_all(time, dt);
        self.stage.advance_animation(dt);
        self.renderer.render(self.stage.graph(), &self.camera);
        if let Some(controller) = self.controller.as_mut() {
            controller.update(&mut self.camera, self.stage.graph(), dt);
        }
        self.scene.frame(&mut self.stage, time, dt);

        self.frames += 1;
        true
    }

    /// Drive up to `count` frames and return how many ran.
    pub fn run_frames(&mut self, count: u64) -> u64 {
        let mut ran = 0;
        while ran < count && self.frame() {
            ran += 1;
        }
        ran
    }

    /// Forward a new surface size to the camera and renderer.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
        self.camera.resize(width, height);
        self.renderer.resize(width, height);
    }

    /// Tear the scene down. Calling it again does nothing.
    ///
    /// Order: the scene's `before_destroy`, every behaviour's
    /// `before_destroy`, stop the loop, release render resources of every
    /// node, dispose the renderer, then drop nodes, behaviours and models.
    pub fn destroy(&mut self) {
        if self.state == ShellState::Destroyed {
            return;
        }
        self.scene.before_destroy(&mut self.stage);
        self.stage.before_destroy_all();

        // No more frames from here on.
        self.set_state(ShellState::Destroyed);
        self.generation += 1;

        let released = self.stage.graph_mut().dispose_all();
        log::debug!("released render resources of {} node(s)", released);
        self.renderer.dispose();
        self.stage.teardown();
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        self.destroy();
    }
}
