use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::coords::Size;

/// Number of texture units a binding set may address.
pub const TEXTURE_UNITS: usize = 16;

/// Sampling filter requested by a binding.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum TextureFilter {
    #[default]
    Nearest,
    Linear,
}

/// Address mode fixed at texture creation.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum TextureWrap {
    #[default]
    Clamp,
    Repeat,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// GPU-side storage of a texture. Absent for detached (headless) textures.
pub(crate) struct GpuImage {
    pub(crate) view: wgpu::TextureView,
    // Kept alive for as long as the view is.
    pub(crate) _texture: wgpu::Texture,
}

struct TextureInner {
    id: TextureId,
    label: String,
    width: u32,
    height: u32,
    wrap: TextureWrap,
    gpu: Option<GpuImage>,
}

impl Drop for TextureInner {
    fn drop(&mut self) {
        log::debug!("texture released: {}", self.label);
    }
}

/// Shared texture handle.
///
/// Cloning is cheap; the pixels are freed when the last handle (held by a map,
/// a sheet binding or a queued draw) goes away. Equality is handle identity.
#[derive(Clone)]
pub struct Texture(Arc<TextureInner>);

impl Texture {
    /// Texture with no GPU storage; binds to the backend's fallback image.
    pub fn detached(label: impl Into<String>, width: u32, height: u32) -> Self {
        Self::build(label.into(), width, height, TextureWrap::default(), None)
    }

    pub(crate) fn with_gpu(
        label: String,
        width: u32,
        height: u32,
        wrap: TextureWrap,
        gpu: GpuImage,
    ) -> Self {
        Self::build(label, width, height, wrap, Some(gpu))
    }

    fn build(label: String, width: u32, height: u32, wrap: TextureWrap, gpu: Option<GpuImage>) -> Self {
        log::debug!("texture created: {label} ({width}x{height})");
        Texture(Arc::new(TextureInner {
            id: TextureId::next(),
            label,
            width,
            height,
            wrap,
            gpu,
        }))
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.0.id
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.0.label
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.0.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.0.height
    }

    /// Size in texels, as floats for UV math.
    #[inline]
    pub fn size(&self) -> Size {
        Size::new(self.0.width as f32, self.0.height as f32)
    }

    #[inline]
    pub fn wrap(&self) -> TextureWrap {
        self.0.wrap
    }

    #[inline]
    pub(crate) fn gpu_view(&self) -> Option<&wgpu::TextureView> {
        self.0.gpu.as_ref().map(|g| &g.view)
    }

    /// Number of live handles, including this one.
    #[inline]
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl PartialEq for Texture {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Texture {}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.0.id)
            .field("label", &self.0.label)
            .field("size", &(self.0.width, self.0.height))
            .finish()
    }
}

/// Decoded RGBA8 pixels ready for upload.
#[derive(Debug, Clone)]
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaImage {
    /// Decodes a PNG (or any format enabled on the `image` crate) into RGBA8.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::decode(&bytes).with_context(|| format!("failed to load texture {}", path.display()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes).context("failed to decode image")?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }
}

/// One `(texture, unit, filter)` requirement of a draw.
///
/// A `None` texture explicitly leaves its unit unbound.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBind {
    pub texture: Option<Texture>,
    pub unit: u8,
    pub filter: TextureFilter,
}

impl TextureBind {
    #[inline]
    pub fn new(texture: Texture, unit: u8, filter: TextureFilter) -> Self {
        Self {
            texture: Some(texture),
            unit,
            filter,
        }
    }

    #[inline]
    pub fn empty(unit: u8) -> Self {
        Self {
            texture: None,
            unit,
            filter: TextureFilter::default(),
        }
    }
}

/// Unordered set of texture bindings shared by every sprite in a batch bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingSet(Arc<[TextureBind]>);

impl BindingSet {
    pub fn new(binds: impl Into<Vec<TextureBind>>) -> Self {
        Self(Arc::from(binds.into()))
    }

    /// The common case: one texture on unit 0.
    pub fn single(texture: &Texture, filter: TextureFilter) -> Self {
        Self::new(vec![TextureBind::new(texture.clone(), 0, filter)])
    }

    #[inline]
    pub fn binds(&self) -> &[TextureBind] {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether `unit` is named by any binding.
    #[inline]
    pub fn references_unit(&self, unit: u8) -> bool {
        self.0.iter().any(|b| b.unit == unit)
    }

    /// The binding on unit 0, which defines UV normalisation.
    pub fn primary(&self) -> Option<&Texture> {
        self.0
            .iter()
            .find(|b| b.unit == 0)
            .and_then(|b| b.texture.as_ref())
    }

    /// Whether a draw with `self` joins a bucket created for `existing`.
    ///
    /// Each binding here counts as found if `existing` has an identical
    /// `(texture, unit, filter)` triple, or if its texture is `None`. The sets
    /// match when that count equals the larger of the two set sizes. Because of
    /// the `None` rule, two untextured draws on different units still share a
    /// bucket.
    pub fn matches(&self, existing: &BindingSet) -> bool {
        let found = self
            .0
            .iter()
            .filter(|t| t.texture.is_none() || existing.0.iter().any(|b| b == *t))
            .count();
        found == self.0.len().max(existing.0.len())
    }
}
