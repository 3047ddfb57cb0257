/// Quarter-turn rotation stored in the low two flag bits.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum TileRotation {
    #[default]
    None = 0,
    Deg90 = 1,
    Deg180 = 2,
    Deg270 = 3,
}

impl TileRotation {
    #[inline]
    pub fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => TileRotation::None,
            1 => TileRotation::Deg90,
            2 => TileRotation::Deg180,
            _ => TileRotation::Deg270,
        }
    }

    #[inline]
    pub fn degrees(self) -> f32 {
        (self as u8) as f32 * 90.0
    }
}

const FLAG_FLIP_Y: u8 = 1 << 2;
const FLAG_FLIP_X: u8 = 1 << 3;
const FLAG_INVISIBLE: u8 = 1 << 4;

/// One map cell.
///
/// `sheet` selects both the texture and the sheet bound on the map under
/// that id; `id` is the frame inside that sheet.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Tile {
    pub id: u16,
    pub sheet: u8,
    pub invisible: bool,
    pub flip_x: bool,
    pub flip_y: bool,
    pub rotation: TileRotation,
}

impl Tile {
    pub fn new(id: u16, sheet: u8) -> Self {
        Self {
            id,
            sheet,
            ..Self::default()
        }
    }

    /// Decodes the on-disk flag byte. Unused high bits are ignored.
    pub fn from_record(id: u16, sheet: u8, flags: u8) -> Self {
        Self {
            id,
            sheet,
            invisible: flags & FLAG_INVISIBLE != 0,
            flip_x: flags & FLAG_FLIP_X != 0,
            flip_y: flags & FLAG_FLIP_Y != 0,
            rotation: TileRotation::from_bits(flags),
        }
    }

    pub fn flags(&self) -> u8 {
        let mut flags = self.rotation as u8;
        if self.flip_y {
            flags |= FLAG_FLIP_Y;
        }
        if self.flip_x {
            flags |= FLAG_FLIP_X;
        }
        if self.invisible {
            flags |= FLAG_INVISIBLE;
        }
        flags
    }
}
