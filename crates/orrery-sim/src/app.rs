use std::path::PathBuf;

use winit::dpi::LogicalSize;

use orrery_engine::core::{App as EngineApp, AppControl, FrameCtx};
use orrery_engine::device::GpuInit;
use orrery_engine::render::{DrawList, SceneRenderer, TextureStore};
use orrery_engine::window::{Runtime, RuntimeConfig};

use crate::controls::FrameControls;
use crate::solar_system::{SceneConfig, SolarSystem};

/// Top-level application builder.
///
/// ```rust,ignore
/// Application::new()
///     .title("Solar System")
///     .texture_dir("assets/textures")
///     .run()?;
/// ```
pub struct Application {
    title: String,
    width: f64,
    height: f64,
    scene: SceneConfig,
    gpu: GpuInit,
}

impl Application {
    pub fn new() -> Self {
        Self {
            title: "Solar System".to_string(),
            width: 1200.0,
            height: 900.0,
            scene: SceneConfig::default(),
            gpu: GpuInit::default(),
        }
    }

    /// Set the window title.
    pub fn title(mut self, t: impl Into<String>) -> Self {
        self.title = t.into();
        self
    }

    /// Set the initial window size in logical pixels.
    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Directory holding `sun.vert.wgsl` and friends.
    pub fn shader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scene.shader_dir = dir.into();
        self
    }

    /// Directory holding the body textures (`sunmap.jpg`, `earthmap1k.jpg`, ...).
    pub fn texture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scene.texture_dir = dir.into();
        self
    }

    pub fn gpu(mut self, init: GpuInit) -> Self {
        self.gpu = init;
        self
    }

    /// Builds the scene and runs the event loop until the window closes or
    /// Escape is pressed.
    pub fn run(self) -> anyhow::Result<()> {
        let config = RuntimeConfig {
            title: self.title.clone(),
            initial_size: LogicalSize::new(self.width, self.height),
            ..Default::default()
        };
        let state = SceneAppState::new(self.title.clone(), self.scene);
        Runtime::run(config, self.gpu, state)
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

/// Window title with the user-adjustable speeds appended.
fn speed_title(base: &str, system: &SolarSystem) -> String {
    let sun = system.sun().rotation_speed();
    let moon = system.moon().map(|m| m.orbit_speed()).unwrap_or_default();
    format!("{base} | sun spin {sun:.1}°/s | moon orbit {moon:.1}°/s")
}

/// Internal state that implements `orrery_engine::core::App`.
struct SceneAppState {
    title: String,
    // Declared first so the bodies drop before the store they release into.
    system: SolarSystem,
    textures: TextureStore,
    draws: DrawList,
    renderer: SceneRenderer,
}

impl SceneAppState {
    fn new(title: String, config: SceneConfig) -> Self {
        let mut textures = TextureStore::new();
        let system = SolarSystem::new(config, &mut textures);
        Self {
            title,
            system,
            textures,
            draws: DrawList::new(),
            renderer: SceneRenderer::new(),
        }
    }
}

impl EngineApp for SceneAppState {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let dt = ctx.time.dt;

        let controls = FrameControls::sample(ctx.input, ctx.input_frame);
        if controls.exit {
            log::info!("escape pressed, exiting");
            return AppControl::Exit;
        }
        self.system.apply_controls(&controls, dt);
        if controls.sun_rotation_delta != 0.0 || controls.moon_orbit_delta != 0.0 {
            let title = speed_title(&self.title, &self.system);
            ctx.runtime.set_title(title);
        }

        self.system.update(dt);

        self.draws.clear();
        self.system.render(ctx.window.aspect(), &mut self.draws);

        let clear = self.system.config().clear_color;
        let ([sun, planet], mesh) = self.system.render_resources();
        let draws = &self.draws;
        let textures = &mut self.textures;
        let renderer = &mut self.renderer;

        ctx.render(clear, |rctx, target| {
            renderer.render(rctx, target, draws, &mut [sun, planet], &mut [mesh], textures);
        })
    }
}
