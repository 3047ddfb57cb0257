use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};

use crate::coords::Vec2;
use crate::graphics::{BindingSet, Graphics, LAYER_COUNT, LayerPhase, Sheet, SpriteParams, Texture, TextureFilter};
use crate::io::{BinaryReader, BinaryWriter};

use super::Tile;

pub const MAP_MAGIC: &str = "VIOLMAP";
pub const MAP_VERSION: u8 = 1;

/// One of the map's 256 layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapLayer {
    pub scroll: Vec2,
    /// Row-major `width * height` cells, `None` when the file never wrote this layer.
    pub tiles: Option<Vec<Tile>>,
}

/// Layered tile grid (VIOLMAP) plus the textures and sheets it draws with.
///
/// Layout (little-endian):
/// - `"VIOLMAP"`, version `u8` (= 1)
/// - width, height, grid width, grid height as `u16`
/// - layer count `u8`, then per layer: layer index `u8` and
///   `width * height` records of `id: u16, sheet: u8, flags: u8`
pub struct TileMap {
    name: String,
    width: u16,
    height: u16,
    grid_width: u16,
    grid_height: u16,
    layers: Vec<MapLayer>,
    textures: HashMap<u8, Texture>,
    sheets: HashMap<u8, Arc<Sheet>>,
}

impl TileMap {
    /// An empty map with every layer absent.
    pub fn new(name: impl Into<String>, width: u16, height: u16, grid_width: u16, grid_height: u16) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            grid_width,
            grid_height,
            layers: vec![MapLayer::default(); LAYER_COUNT],
            textures: HashMap::new(),
            sheets: HashMap::new(),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = BinaryReader::open(path.as_ref())?;
        Self::read_from(&mut reader)
    }

    pub fn read_from<R: Read>(reader: &mut BinaryReader<R>) -> Result<Self> {
        reader.expect_magic(MAP_MAGIC)?;
        reader.expect_version(MAP_VERSION)?;

        let width = reader.read_u16()?;
        let height = reader.read_u16()?;
        let grid_width = reader.read_u16()?;
        let grid_height = reader.read_u16()?;
        let mut map = Self::new(reader.path().display().to_string(), width, height, grid_width, grid_height);

        let cells = map.cell_count();
        let layer_count = reader.read_u8()?;
        for _ in 0..layer_count {
            let index = reader.read_u8()? as usize;
            // Header sizes are untrusted until the tile data is actually there.
            let mut tiles = Vec::with_capacity(cells.min(4096));
            for _ in 0..cells {
                let id = reader.read_u16()?;
                let sheet = reader.read_u8()?;
                let flags = reader.read_u8()?;
                tiles.push(Tile::from_record(id, sheet, flags));
            }
            map.layers[index].tiles = Some(tiles);
        }

        log::debug!("map loaded: {} ({}x{}, {} layers)", map.name, width, height, layer_count);
        Ok(map)
    }

    /// Writes every populated layer in ascending index order.
    pub fn write_to<W: Write>(&self, writer: &mut BinaryWriter<W>) -> Result<()> {
        let populated: Vec<(usize, &[Tile])> = self
            .layers
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.tiles.as_deref().map(|t| (i, t)))
            .collect();
        let Ok(count) = u8::try_from(populated.len()) else {
            bail!("{}: {} populated layers do not fit the layer count byte", self.name, populated.len());
        };

        writer.write_bytes(MAP_MAGIC.as_bytes())?;
        writer.write_u8(MAP_VERSION)?;
        writer.write_u16(self.width)?;
        writer.write_u16(self.height)?;
        writer.write_u16(self.grid_width)?;
        writer.write_u16(self.grid_height)?;
        writer.write_u8(count)?;
        for (index, tiles) in populated {
            writer.write_u8(index as u8)?;
            for tile in tiles {
                writer.write_u16(tile.id)?;
                writer.write_u8(tile.sheet)?;
                writer.write_u8(tile.flags())?;
            }
        }
        Ok(())
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Grid cell size in pixels.
    #[inline]
    pub fn grid_size(&self) -> (u16, u16) {
        (self.grid_width, self.grid_height)
    }

    #[inline]
    fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn layer(&self, index: usize) -> Option<&MapLayer> {
        self.layers.get(index)
    }

    /// Replaces a layer's cells. The tile count must equal `width * height`.
    pub fn set_layer_tiles(&mut self, index: usize, tiles: Vec<Tile>) -> Result<()> {
        if tiles.len() != self.cell_count() {
            bail!(
                "{}: layer {index} needs {} tiles, got {}",
                self.name,
                self.cell_count(),
                tiles.len()
            );
        }
        match self.layers.get_mut(index) {
            Some(layer) => layer.tiles = Some(tiles),
            None => bail!("{}: layer {index} out of range", self.name),
        }
        Ok(())
    }

    pub fn tile(&self, layer: usize, x: u16, y: u16) -> Option<&Tile> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let tiles = self.layers.get(layer)?.tiles.as_ref()?;
        tiles.get(x as usize + y as usize * self.width as usize)
    }

    // ── bindings ─────────────────────────────────────────────────────────

    pub fn set_texture(&mut self, id: u8, texture: Texture) {
        self.textures.insert(id, texture);
    }

    pub fn set_sheet(&mut self, id: u8, sheet: Arc<Sheet>) {
        self.sheets.insert(id, sheet);
    }

    // ── scrolling ────────────────────────────────────────────────────────
    // Layers outside 0..256 are ignored.

    pub fn scroll(&self, layer: usize) -> Option<Vec2> {
        self.layers.get(layer).map(|l| l.scroll)
    }

    pub fn set_scroll_x(&mut self, layer: usize, x: f32) {
        if let Some(l) = self.layers.get_mut(layer) {
            l.scroll.x = x;
        }
    }

    pub fn set_scroll_y(&mut self, layer: usize, y: f32) {
        if let Some(l) = self.layers.get_mut(layer) {
            l.scroll.y = y;
        }
    }

    pub fn set_scroll(&mut self, layer: usize, pos: Vec2) {
        if let Some(l) = self.layers.get_mut(layer) {
            l.scroll = pos;
        }
    }

    pub fn add_scroll_x(&mut self, layer: usize, dx: f32) {
        if let Some(l) = self.layers.get_mut(layer) {
            l.scroll.x += dx;
        }
    }

    pub fn add_scroll_y(&mut self, layer: usize, dy: f32) {
        if let Some(l) = self.layers.get_mut(layer) {
            l.scroll.y += dy;
        }
    }

    pub fn add_scroll(&mut self, layer: usize, offset: Vec2) {
        if let Some(l) = self.layers.get_mut(layer) {
            l.scroll += offset;
        }
    }

    // ── drawing ──────────────────────────────────────────────────────────

    /// Queues every visible tile into the Map phase of its layer.
    ///
    /// Rows and columns start far enough before the viewport that the largest
    /// frame of any bound sheet, anchored one or more cells off-screen, still
    /// reaches into view.
    pub fn draw(&self, gfx: &mut Graphics) {
        if self.grid_width == 0 || self.grid_height == 0 {
            log::trace!("map {}: zero grid size, nothing drawn", self.name);
            return;
        }
        let grid_w = self.grid_width as f32;
        let grid_h = self.grid_height as f32;

        // Only sheet ids with both a texture and a sheet can draw.
        let bound: HashMap<u8, (BindingSet, &Sheet)> = self
            .sheets
            .iter()
            .filter_map(|(id, sheet)| {
                let texture = self.textures.get(id)?;
                Some((*id, (BindingSet::single(texture, TextureFilter::Nearest), sheet.as_ref())))
            })
            .collect();

        let max = self
            .sheets
            .values()
            .fold(crate::coords::Size::default(), |acc, s| acc.max(s.max_sprite_size()));
        let (draw_back_x, map_back_x) = back_padding(max.width, grid_w);
        let (draw_back_y, map_back_y) = back_padding(max.height, grid_h);

        let view = gfx.view_size();
        for (index, layer) in self.layers.iter().enumerate() {
            let Some(tiles) = layer.tiles.as_deref() else {
                continue;
            };

            let cell_x = (layer.scroll.x / grid_w).floor();
            let cell_y = (layer.scroll.y / grid_h).floor();
            let init_map_x = cell_x as i64 - map_back_x;
            let init_draw_x = cell_x * grid_w - layer.scroll.x - draw_back_x;
            let mut map_y = cell_y as i64 - map_back_y;
            let mut draw_y = cell_y * grid_h - layer.scroll.y - draw_back_y;

            while draw_y < view.height {
                let mut map_x = init_map_x;
                let mut draw_x = init_draw_x;

                while draw_x < view.width {
                    if let Some(tile) = self.cell(tiles, map_x, map_y) {
                        self.draw_tile(gfx, &bound, index as u8, tile, Vec2::new(draw_x, draw_y));
                    }
                    map_x += 1;
                    draw_x += grid_w;
                }

                map_y += 1;
                draw_y += grid_h;
            }
        }
    }

    fn cell<'a>(&self, tiles: &'a [Tile], x: i64, y: i64) -> Option<&'a Tile> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        tiles.get(x as usize + y as usize * self.width as usize)
    }

    fn draw_tile(
        &self,
        gfx: &mut Graphics,
        bound: &HashMap<u8, (BindingSet, &Sheet)>,
        layer: u8,
        tile: &Tile,
        pos: Vec2,
    ) {
        if tile.invisible {
            return;
        }
        let Some((bindings, sheet)) = bound.get(&tile.sheet) else {
            return;
        };
        let Some(frame) = sheet.frame(tile.id as usize) else {
            return;
        };
        let params = SpriteParams::new(layer, pos + frame.origin);
        sheet.draw_in(gfx, LayerPhase::Map, bindings.clone(), tile.id as usize, params);
    }
}

impl Drop for TileMap {
    fn drop(&mut self) {
        log::debug!("map released: {}", self.name);
    }
}

impl std::fmt::Debug for TileMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileMap")
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("grid", &(self.grid_width, self.grid_height))
            .field("textures", &self.textures.len())
            .field("sheets", &self.sheets.len())
            .finish_non_exhaustive()
    }
}

/// Pixel and cell padding needed before the first visible cell.
fn back_padding(max_sprite: f32, grid: f32) -> (f32, i64) {
    if max_sprite > grid {
        let draw_back = (max_sprite / grid).ceil() * grid;
        (draw_back, (draw_back / grid) as i64)
    } else {
        (0.0, 0)
    }
}
