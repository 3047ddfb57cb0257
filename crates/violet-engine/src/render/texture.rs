use std::sync::Arc;

use anyhow::Result;

use crate::gpu::TextureFactory;
use crate::graphics::{GpuImage, RgbaImage, Texture, TextureWrap};

/// Uploads decoded images to the GPU.
///
/// Holds shared device/queue handles so it can outlive a borrowed `RenderCtx`.
#[derive(Clone)]
pub struct WgpuTextureFactory {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl WgpuTextureFactory {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self { device, queue }
    }
}

impl TextureFactory for WgpuTextureFactory {
    fn create_texture(&self, label: &str, image: &RgbaImage, wrap: TextureWrap) -> Result<Texture> {
        anyhow::ensure!(
            image.width > 0 && image.height > 0,
            "texture {label} has zero size"
        );
        anyhow::ensure!(
            image.pixels.len() == image.width as usize * image.height as usize * 4,
            "texture {label}: pixel buffer does not match {}x{} RGBA",
            image.width,
            image.height
        );

        let gpu = upload_rgba(&self.device, &self.queue, label, image.width, image.height, &image.pixels);
        Ok(Texture::with_gpu(label.to_string(), image.width, image.height, wrap, gpu))
    }
}

pub(super) fn upload_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> GpuImage {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuImage {
        view,
        _texture: texture,
    }
}
