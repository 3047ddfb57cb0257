/// Number of caller-visible layers.
pub const LAYER_COUNT: usize = 256;

/// Number of lifecycle phases interleaved inside each layer.
pub const PHASE_COUNT: usize = 4;

/// Size of the ordered slot space walked by every flush.
pub const TOTAL_LAYER_SLOTS: usize = LAYER_COUNT * PHASE_COUNT;

/// Lifecycle phase a draw was issued from.
///
/// Within one layer number, phases draw in declaration order, so map tiles are
/// always under actors on the same layer.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum LayerPhase {
    #[default]
    UpdateStart = 0,
    Map = 1,
    Actor = 2,
    UpdateEnd = 3,
}

impl LayerPhase {
    pub const ALL: [LayerPhase; PHASE_COUNT] = [
        LayerPhase::UpdateStart,
        LayerPhase::Map,
        LayerPhase::Actor,
        LayerPhase::UpdateEnd,
    ];
}

/// Flattened `(layer, phase)` draw-order key: `layer * 4 + phase`.
///
/// Ordering rules:
/// 1) `layer`: ascending (back-to-front)
/// 2) `phase`: ascending within a layer
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct LayerKey(u16);

impl LayerKey {
    #[inline]
    pub const fn new(layer: u8, phase: LayerPhase) -> Self {
        Self(layer as u16 * PHASE_COUNT as u16 + phase as u16)
    }

    /// Slot index in `0..TOTAL_LAYER_SLOTS`.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn layer(self) -> u8 {
        (self.0 / PHASE_COUNT as u16) as u8
    }

    #[inline]
    pub const fn phase(self) -> LayerPhase {
        LayerPhase::ALL[(self.0 % PHASE_COUNT as u16) as usize]
    }
}
