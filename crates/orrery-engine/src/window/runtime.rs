use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App as CoreApp, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::input::platform::winit::translate_window_event;
use crate::input::{InputFrame, InputState};
use crate::time::FrameClock;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub resizable: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "Solar System".to_string(),
            initial_size: LogicalSize::new(1200.0, 900.0),
            resizable: true,
        }
    }
}

/// Requests the application makes during `on_frame`.
///
/// Buffered and applied after the callback returns.
#[derive(Default)]
pub struct RuntimeCtx {
    commands: Vec<Command>,
}

impl RuntimeCtx {
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.commands.push(Command::SetTitle(title.into()));
    }

    pub fn exit(&mut self) {
        self.commands.push(Command::Exit);
    }
}

#[derive(Debug, PartialEq)]
enum Command {
    SetTitle(String),
    Exit,
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the scene window and drives `app` until it exits or the window
    /// closes.
    ///
    /// Fails if the event loop, the window or the GPU cannot be created.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = SceneLoop::new(config, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        state.finish()
    }
}

/// The window together with everything that lives as long as it does.
#[self_referencing]
struct SceneWindow {
    input_state: InputState,
    input_frame: InputFrame,
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

impl SceneWindow {
    fn open(event_loop: &ActiveEventLoop, config: &RuntimeConfig, gpu_init: GpuInit) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(config.initial_size)
            .with_resizable(config.resizable);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        SceneWindowTryBuilder {
            input_state: InputState::default(),
            input_frame: InputFrame::default(),
            clock: FrameClock::default(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed")
    }

    fn id(&self) -> WindowId {
        self.with_window(|w| w.id())
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.with_gpu_mut(|gpu| gpu.resize(size));
        self.with_window(|w| w.request_redraw());
    }
}

struct SceneLoop<A>
where
    A: CoreApp + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    // After `app`: the scene's GPU resources drop before the surface.
    window: Option<SceneWindow>,
    startup_error: Option<anyhow::Error>,
    exit_requested: bool,
}

impl<A> SceneLoop<A>
where
    A: CoreApp + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            app,
            window: None,
            startup_error: None,
            exit_requested: false,
        }
    }

    /// Keeps the error for `finish` and stops the loop.
    fn fail_startup(&mut self, err: anyhow::Error) {
        log::error!("startup failed: {err:#}");
        self.startup_error = Some(err);
        self.exit_requested = true;
    }

    /// Result of the whole run, read once the event loop has returned.
    fn finish(mut self) -> Result<()> {
        match self.startup_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn apply(&mut self, commands: Vec<Command>) {
        for cmd in commands {
            match cmd {
                Command::SetTitle(title) => {
                    if let Some(window) = &self.window {
                        window.with_window(|w| w.set_title(&title));
                    }
                }
                Command::Exit => self.exit_requested = true,
            }
        }
    }

    fn redraw(&mut self) {
        let Some(window) = self.window.as_mut() else {
            return;
        };

        let app = &mut self.app;
        let mut runtime = RuntimeCtx::default();

        let control = window.with_mut(|fields| {
            let mut ctx = FrameCtx {
                window: WindowCtx {
                    id: fields.window.id(),
                    window: fields.window,
                },
                gpu: fields.gpu,
                input: fields.input_state,
                input_frame: fields.input_frame,
                time: fields.clock.tick(),
                runtime: &mut runtime,
            };
            let control = app.on_frame(&mut ctx);

            fields.input_frame.clear();
            control
        });

        if control == AppControl::Exit {
            runtime.exit();
        }
        self.apply(runtime.commands);
    }
}

impl<A> ApplicationHandler for SceneLoop<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.startup_error.is_some() {
            return;
        }

        match SceneWindow::open(event_loop, &self.config, self.gpu_init.clone()) {
            Ok(window) => {
                log::info!("window {:?} created", window.id());
                window.with_window(|w| w.request_redraw());
                self.window = Some(window);
            }
            Err(err) => {
                self.fail_startup(err);
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        // The scene animates every frame.
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(window) = &self.window {
            window.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.as_mut().filter(|w| w.id() == window_id) else {
            return;
        };

        window.with_mut(|fields| {
            if let Some(ev) = translate_window_event(fields.window, &event) {
                fields.input_state.apply_event(fields.input_frame, ev);
            }
        });

        if self.app.on_window_event(window_id, &event) == AppControl::Exit {
            self.exit_requested = true;
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("window closed");
                self.exit_requested = true;
            }
            WindowEvent::Resized(size) => window.resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = window.with_window(|w| w.inner_size());
                window.resize(size);
            }
            WindowEvent::RedrawRequested if !self.exit_requested => self.redraw(),
            _ => {}
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Idle;

    impl CoreApp for Idle {
        fn on_frame(&mut self, _ctx: &mut FrameCtx<'_, '_>) -> AppControl {
            AppControl::Continue
        }
    }

    fn scene_loop() -> SceneLoop<Idle> {
        SceneLoop::new(RuntimeConfig::default(), GpuInit::default(), Idle)
    }

    #[test]
    fn clean_run_finishes_ok() {
        assert!(scene_loop().finish().is_ok());
    }

    #[test]
    fn startup_failure_is_returned_from_the_run() {
        let mut state = scene_loop();
        state.fail_startup(anyhow::anyhow!("no suitable adapter").context("GPU initialization failed"));
        assert!(state.exit_requested);

        let err = state.finish().expect_err("startup failure must surface");
        assert_eq!(err.to_string(), "GPU initialization failed");
        assert_eq!(err.root_cause().to_string(), "no suitable adapter");
    }

    #[test]
    fn commands_apply_in_order_without_a_window() {
        let mut runtime = RuntimeCtx::default();
        runtime.set_title("Solar System | sun spin 10.0°/s");
        runtime.exit();
        assert_eq!(
            runtime.commands,
            vec![
                Command::SetTitle("Solar System | sun spin 10.0°/s".to_string()),
                Command::Exit
            ]
        );

        let mut state = scene_loop();
        state.apply(runtime.commands);
        assert!(state.exit_requested);
    }
}
