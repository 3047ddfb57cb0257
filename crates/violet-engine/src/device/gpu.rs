use std::sync::Arc;

use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

/// Adapter and surface preferences.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Pick an sRGB surface when one exists. Textures are uploaded as sRGB, so
    /// this keeps sprite colors unchanged.
    pub prefer_srgb: bool,
    /// Ask for the integrated adapter instead of the discrete one.
    pub low_power: bool,
    /// Frames the presentation engine may queue ahead.
    pub frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            low_power: false,
            frame_latency: 2,
        }
    }
}

/// Device, queue and the window's swap chain.
///
/// Device and queue are reference-counted so texture factories can keep them.
/// The surface borrows the window for `'w`.
pub struct Gpu<'w> {
    surface: wgpu::Surface<'w>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    present_modes: Vec<wgpu::PresentMode>,
}

/// An acquired swap-chain image with an encoder recording into it.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

/// What to do after `Gpu::acquire` failed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// The surface was reconfigured; the next frame can try again.
    Reconfigured,
    SkipFrame,
    /// Out of memory. Shut down.
    Fatal,
}

impl<'w> Gpu<'w> {
    /// Opens the device and configures the window surface. `vsync` picks
    /// `Fifo` or `AutoNoVsync`.
    pub async fn new(window: &'w Window, init: GpuInit, vsync: bool) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let power_preference = if init.low_power {
            wgpu::PowerPreference::LowPower
        } else {
            wgpu::PowerPreference::HighPerformance
        };
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("violet-engine device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let caps = surface.get_capabilities(&adapter);
        let format = surface_format(&caps.formats, init.prefer_srgb).context("no supported surface formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: present_mode(&caps.present_modes, vsync),
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: init.frame_latency,
        };
        surface.configure(&device, &config);

        let info = adapter.get_info();
        log::info!("gpu ready: {} ({:?}), surface {format:?}", info.name, info.backend);

        Ok(Gpu {
            surface,
            device: Arc::new(device),
            queue: Arc::new(queue),
            config,
            present_modes: caps.present_modes,
        })
    }

    #[inline]
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn device_handle(&self) -> Arc<wgpu::Device> {
        Arc::clone(&self.device)
    }

    pub fn queue_handle(&self) -> Arc<wgpu::Queue> {
        Arc::clone(&self.queue)
    }

    /// Switches between `Fifo` and `AutoNoVsync`.
    pub fn set_vsync(&mut self, vsync: bool) {
        let mode = present_mode(&self.present_modes, vsync);
        if self.config.present_mode == mode {
            return;
        }
        self.config.present_mode = mode;
        self.surface.configure(&self.device, &self.config);
        log::debug!("present mode set to {mode:?}");
    }

    /// Follows the window size. A minimised (0x0) window keeps the old
    /// configuration; wgpu rejects empty surfaces.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Takes the next swap-chain image.
    pub fn acquire(&self) -> std::result::Result<GpuFrame, SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("violet frame encoder"),
            });

        Ok(GpuFrame {
            surface_texture,
            view,
            encoder,
        })
    }

    /// Submits the frame's commands and presents the image.
    pub fn present(&self, frame: GpuFrame) {
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.surface_texture.present();
    }

    pub fn recover(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        match err {
            SurfaceError::Lost | SurfaceError::Outdated => {
                self.surface.configure(&self.device, &self.config);
                SurfaceErrorAction::Reconfigured
            }
            SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
            SurfaceError::Timeout | SurfaceError::Other => SurfaceErrorAction::SkipFrame,
        }
    }
}

/// Without vsync the engine wants the lowest-latency mode the surface has.
/// Fifo is the one mode every surface supports.
fn present_mode(supported: &[wgpu::PresentMode], vsync: bool) -> wgpu::PresentMode {
    use wgpu::PresentMode::{Fifo, Immediate, Mailbox};
    if vsync {
        return Fifo;
    }
    [Immediate, Mailbox]
        .into_iter()
        .find(|mode| supported.contains(mode))
        .unwrap_or(Fifo)
}

fn surface_format(formats: &[wgpu::TextureFormat], prefer_srgb: bool) -> Option<wgpu::TextureFormat> {
    let srgb = [wgpu::TextureFormat::Bgra8UnormSrgb, wgpu::TextureFormat::Rgba8UnormSrgb];
    prefer_srgb
        .then(|| srgb.into_iter().find(|f| formats.contains(f)))
        .flatten()
        .or_else(|| formats.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::PresentMode;
    use wgpu::TextureFormat as Tf;

    // ── present mode ─────────────────────────────────────────────────────

    #[test]
    fn vsync_always_presents_fifo() {
        let all = [PresentMode::Immediate, PresentMode::Mailbox, PresentMode::Fifo];
        assert_eq!(present_mode(&all, true), PresentMode::Fifo);
    }

    #[test]
    fn unsynced_prefers_immediate_then_mailbox() {
        let all = [PresentMode::Fifo, PresentMode::Mailbox, PresentMode::Immediate];
        assert_eq!(present_mode(&all, false), PresentMode::Immediate);
        let no_tearing = [PresentMode::Fifo, PresentMode::Mailbox];
        assert_eq!(present_mode(&no_tearing, false), PresentMode::Mailbox);
    }

    #[test]
    fn unsynced_falls_back_to_fifo() {
        assert_eq!(present_mode(&[PresentMode::Fifo], false), PresentMode::Fifo);
        assert_eq!(present_mode(&[], false), PresentMode::Fifo);
    }

    // ── surface format ───────────────────────────────────────────────────

    #[test]
    fn srgb_surface_is_picked_over_the_first_listed() {
        let formats = [Tf::Bgra8Unorm, Tf::Rgba8UnormSrgb];
        assert_eq!(surface_format(&formats, true), Some(Tf::Rgba8UnormSrgb));
        assert_eq!(surface_format(&formats, false), Some(Tf::Bgra8Unorm));
    }

    #[test]
    fn linear_only_surface_still_gets_a_format() {
        assert_eq!(surface_format(&[Tf::Rgba16Float], true), Some(Tf::Rgba16Float));
        assert_eq!(surface_format(&[], true), None);
    }
}
