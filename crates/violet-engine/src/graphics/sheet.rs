use std::io::{Read, Write};
use std::path::Path;

use anyhow::Result;

use crate::coords::{Rect, Size, Vec2};
use crate::error::ResourceError;
use crate::io::{BinaryReader, BinaryWriter};

use super::{BindingSet, Graphics, LayerPhase, SpriteParams, Texture, TextureFilter};

pub const SHEET_MAGIC: &str = "VIOLSPR";
pub const SHEET_VERSION: u8 = 1;

/// One frame of a sprite sheet.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct SheetFrame {
    /// Source rectangle in texels.
    pub source: Rect,
    /// Pivot relative to the source rectangle's top-left.
    pub origin: Vec2,
}

/// Frame table for a texture atlas (VIOLSPR).
///
/// Layout (little-endian):
/// - `"VIOLSPR"`, version `u8` (= 1)
/// - frame count `i32`
/// - per frame: `x, y, w, h, origin_x, origin_y` as `i32`
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    frames: Vec<SheetFrame>,
    max_sprite_size: Size,
}

impl Sheet {
    pub fn new(name: impl Into<String>, frames: Vec<SheetFrame>) -> Self {
        let max_sprite_size = frames.iter().fold(Size::default(), |acc, f| {
            acc.max(Size::new(f.source.w, f.source.h))
        });
        Self {
            name: name.into(),
            frames,
            max_sprite_size,
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = BinaryReader::open(path)?;
        Self::read_from(&mut reader)
    }

    pub fn read_from<R: Read>(reader: &mut BinaryReader<R>) -> Result<Self> {
        reader.expect_magic(SHEET_MAGIC)?;
        reader.expect_version(SHEET_VERSION)?;

        let count = reader.read_i32()?.max(0) as usize;
        let mut frames = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            let x = reader.read_i32()? as f32;
            let y = reader.read_i32()? as f32;
            let w = reader.read_i32()? as f32;
            let h = reader.read_i32()? as f32;
            let ox = reader.read_i32()? as f32;
            let oy = reader.read_i32()? as f32;
            frames.push(SheetFrame {
                source: Rect::new(x, y, w, h),
                origin: Vec2::new(ox, oy),
            });
        }

        let sheet = Self::new(reader.path().display().to_string(), frames);
        log::debug!("sheet loaded: {} ({} frames)", sheet.name, sheet.frames.len());
        Ok(sheet)
    }

    pub fn write_to<W: Write>(&self, writer: &mut BinaryWriter<W>) -> Result<()> {
        writer.write_bytes(SHEET_MAGIC.as_bytes())?;
        writer.write_u8(SHEET_VERSION)?;
        writer.write_i32(self.frames.len() as i32)?;
        for f in &self.frames {
            for v in [f.source.x, f.source.y, f.source.w, f.source.h, f.origin.x, f.origin.y] {
                writer.write_i32(v as i32)?;
            }
        }
        Ok(())
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn frames(&self) -> &[SheetFrame] {
        &self.frames
    }

    #[inline]
    pub fn frame(&self, index: usize) -> Option<&SheetFrame> {
        self.frames.get(index)
    }

    /// Like `frame`, as an error for callers that want one.
    pub fn try_frame(&self, index: usize) -> Result<&SheetFrame, ResourceError> {
        self.frames.get(index).ok_or(ResourceError::FrameOutOfRange)
    }

    /// Largest frame width and height (independently).
    #[inline]
    pub fn max_sprite_size(&self) -> Size {
        self.max_sprite_size
    }

    /// Draws `frame` from `texture` bound on unit 0. Out-of-range frames are skipped.
    pub fn draw(
        &self,
        gfx: &mut Graphics,
        texture: &Texture,
        filter: TextureFilter,
        frame: usize,
        params: SpriteParams,
    ) {
        self.draw_bound(gfx, BindingSet::single(texture, filter), frame, params);
    }

    /// Draws `frame` with an explicit binding set (multi-texture shaders).
    pub fn draw_bound(&self, gfx: &mut Graphics, bindings: BindingSet, frame: usize, params: SpriteParams) {
        let phase = gfx.phase();
        self.draw_in(gfx, phase, bindings, frame, params);
    }

    pub(crate) fn draw_in(
        &self,
        gfx: &mut Graphics,
        phase: LayerPhase,
        bindings: BindingSet,
        frame: usize,
        params: SpriteParams,
    ) {
        let Some(f) = self.frames.get(frame) else {
            log::trace!("sheet {}: frame {frame} out of range", self.name);
            return;
        };
        gfx.add_sprite_in(phase, bindings, params.into_record(f.source, f.origin));
    }
}

impl Drop for Sheet {
    fn drop(&mut self) {
        log::debug!("sheet released: {}", self.name);
    }
}
