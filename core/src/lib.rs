// landscape holds the height field, diamond-square, terrain tile and scenery grid
pub mod config;
pub mod diamond_square;
pub mod error;
pub mod heightfield;
pub mod image_source;
pub mod scenery;
pub mod terrain;
pub mod utils;

pub use config::{ElevationMode, SceneryConfig, SeamPolicy};
pub use diamond_square::{FractalSynthesizer, IndexRect, PinMask, SynthesisReport};
pub use error::{Result, TerrainError};
pub use heightfield::{HeightEdit, HeightField, TerrainVertex};
pub use image_source::ImageHeightSource;
pub use scenery::Scenery;
pub use terrain::{
    DrawMode, ElevationSource, FractalParams, ShaderHandle, Side, Terrain, TerrainDesc,
    TerrainRenderer, TileCoord, TileDrawData,
};
