use anyhow::{Context, Result, anyhow};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Fullscreen, Window, WindowId};

use crate::audio::{self, AudioOutput, OggOpener};
use crate::coords::{ColorRgba, Size};
use crate::core::{App, Engine, EngineConfig};
use crate::device::{Gpu, GpuInit, SurfaceErrorAction};
use crate::input::HotKey;
use crate::input::platform::{KeyAction, translate_key_event};
use crate::render::{RenderCtx, RenderTarget, WgpuBackend, WgpuTextureFactory};
use crate::time::SystemClock;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub engine: EngineConfig,
    /// Open the default audio output. Without it, music and sound calls are
    /// accepted and dropped.
    pub audio: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "violet".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            engine: EngineConfig::default(),
            audio: true,
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window and drives `app` until it exits or the window closes.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<A>
where
    A: App + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: Option<A>,

    // Field order is drop order: the engine releases textures before the
    // window and device go away.
    engine: Option<Engine<A>>,
    backend: WgpuBackend,
    audio: Option<AudioOutput>,
    entry: Option<WindowEntry>,

    fatal: Option<anyhow::Error>,
    exit_requested: bool,
}

impl<A> AppState<A>
where
    A: App + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            app: Some(app),
            engine: None,
            backend: WgpuBackend::new(),
            audio: None,
            entry: None,
            fatal: None,
            exit_requested: false,
        }
    }

    fn create_window_entry(&self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let vsync = self.config.engine.vsync;

        WindowEntryTryBuilder {
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init, vsync)),
        }
        .try_build()
        .context("GPU initialization failed for window")
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let Some(app) = self.app.take() else {
            return Ok(());
        };
        let entry = self.create_window_entry(event_loop)?;

        let (handle, mixer) = audio::channel(OggOpener);
        if self.config.audio {
            match AudioOutput::start(mixer) {
                Ok(output) => self.audio = Some(output),
                Err(e) => log::warn!("audio disabled: {e:#}"),
            }
        }

        let textures = entry.with_gpu(|gpu| WgpuTextureFactory::new(gpu.device_handle(), gpu.queue_handle()));
        let mut engine = Engine::new(
            app,
            &self.config.engine,
            Box::new(SystemClock::new()),
            handle,
            Box::new(textures),
        )?;

        let (size, draw_fps) = entry.with_window(|w| (w.inner_size(), monitor_fps(w)));
        engine.context_mut().gfx().set_window_size(to_size(size));
        engine.context_mut().scheduler_mut().set_draw_fps(draw_fps);

        entry.with_window(|w| w.request_redraw());
        self.entry = Some(entry);
        self.engine = Some(engine);

        self.engine
            .as_mut()
            .map_or(Ok(()), |engine| engine.start())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.fatal.get_or_insert(err);
        self.shutdown(event_loop);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(engine) = self.engine.as_mut() {
            engine.shutdown();
        }
        self.exit_requested = true;
        event_loop.exit();
    }

    fn handle_hot_key(&mut self, key: HotKey) {
        let (Some(engine), Some(entry)) = (self.engine.as_mut(), self.entry.as_mut()) else {
            return;
        };
        let ctx = engine.context_mut();

        match key {
            HotKey::ToggleVsync => {
                let vsync = !ctx.vsync();
                ctx.set_vsync(vsync);
                entry.with_gpu_mut(|gpu| gpu.set_vsync(vsync));
                log::info!("vsync {}", if vsync { "on" } else { "off" });
            }
            HotKey::ToggleFullscreen => entry.with_window(|w| {
                let next = match w.fullscreen() {
                    Some(_) => None,
                    None => Some(Fullscreen::Borderless(None)),
                };
                w.set_fullscreen(next);
            }),
            HotKey::ToggleResizeX => {
                let (x, y) = ctx.graphics().view_resize();
                ctx.gfx().set_view_resize(x.toggled(), y);
                log::info!("view resize x: {:?}", x.toggled());
            }
            HotKey::ToggleResizeY => {
                let (x, y) = ctx.graphics().view_resize();
                ctx.gfx().set_view_resize(x, y.toggled());
                log::info!("view resize y: {:?}", y.toggled());
            }
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if let Some(entry) = self.entry.as_mut() {
            entry.with_gpu_mut(|gpu| gpu.resize(size));
            entry.with_window(|w| w.request_redraw());
        }
        if let Some(engine) = self.engine.as_mut() {
            engine.context_mut().gfx().set_window_size(to_size(size));
        }
    }

    /// Runs one engine frame and presents it when the draw pass ran.
    fn redraw(&mut self) -> Result<bool> {
        let (Some(engine), Some(entry)) = (self.engine.as_mut(), self.entry.as_mut()) else {
            return Ok(false);
        };
        let backend = &mut self.backend;

        let draw_fps = entry.with_window(monitor_fps);
        engine.context_mut().scheduler_mut().set_draw_fps(draw_fps);

        let report = engine.frame(backend)?;
        if report.flush.is_some() {
            let clear = engine.context().graphics().background();
            entry.with_gpu_mut(|gpu| present(gpu, backend, clear))?;
        }

        Ok(engine.context().exit_requested())
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() || self.exit_requested {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Poll);
        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),

            WindowEvent::Focused(false) => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.context_mut().input_mut().release_all();
                }
            }

            WindowEvent::KeyboardInput { event, .. } => match translate_key_event(&event) {
                Some(KeyAction::Button { button, down }) => {
                    if let Some(engine) = self.engine.as_mut() {
                        engine.context_mut().input_mut().set(button, down);
                    }
                }
                Some(KeyAction::HotKey(key)) => self.handle_hot_key(key),
                None => {}
            },

            WindowEvent::Resized(new_size) => self.resize(new_size),

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.entry.as_ref().map(|e| e.with_window(|w| w.inner_size())) {
                    self.resize(size);
                }
            }

            WindowEvent::RedrawRequested => match self.redraw() {
                Ok(true) => self.shutdown(event_loop),
                Ok(false) => {}
                Err(e) => self.fail(event_loop, e),
            },

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(engine) = self.engine.as_mut() {
            engine.shutdown();
        }
    }
}

fn present(gpu: &mut Gpu<'_>, backend: &mut WgpuBackend, clear: ColorRgba) -> Result<()> {
    let mut frame = match gpu.acquire() {
        Ok(frame) => frame,
        Err(err) => {
            let message = err.to_string();
            backend.discard_pending();
            return match gpu.recover(err) {
                SurfaceErrorAction::Fatal => Err(anyhow!("surface failure: {message}")),
                action => {
                    log::debug!("frame skipped ({action:?}): {message}");
                    Ok(())
                }
            };
        }
    };

    {
        let ctx = RenderCtx::new(gpu.device(), gpu.queue(), gpu.surface_format());
        let mut target = RenderTarget::new(&mut frame.encoder, &frame.view);
        backend.render(&ctx, &mut target, clear);
    }

    gpu.present(frame);
    Ok(())
}

/// Refresh rate of the window's monitor, 60 when unknown.
fn monitor_fps(window: &Window) -> f32 {
    window
        .current_monitor()
        .and_then(|m| m.refresh_rate_millihertz())
        .map_or(60.0, |mhz| mhz as f32 / 1000.0)
}

fn to_size(size: PhysicalSize<u32>) -> Size {
    Size::new(size.width as f32, size.height as f32)
}
