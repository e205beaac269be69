use serde::{Deserialize, Serialize};

// One baked tile inside a stored scenery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRecord {
    pub index: usize,
    pub col: usize,
    pub row: usize,
    // Relative to the scenery directory
    pub height_map: String,
    pub min_height: f32,
    pub max_height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneryManifest {
    pub name: String,
    pub seed: u64,
    pub width: usize,
    pub height: usize,
    pub tile_size: f32,
    pub resolution: usize,
    // Modulus the height maps were encoded against
    pub max_height: f32,
    // Add to a decoded sample to recover the original elevation
    pub height_offset: f32,
    // Samples that did not fit the encodable range
    pub clamped_samples: usize,
    pub tiles: Vec<TileRecord>,
}
