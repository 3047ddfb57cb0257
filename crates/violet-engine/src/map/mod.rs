//! Layered tilemaps (VIOLMAP) drawn through the sprite batcher's Map phase.

mod tile;
mod tilemap;

pub use tile::{Tile, TileRotation};
pub use tilemap::{MAP_MAGIC, MAP_VERSION, MapLayer, TileMap};
