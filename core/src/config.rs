// Scenery configuration, loadable from TOML.
// Every field has a default so a partial file (or an empty one) is valid.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};

pub const DEFAULT_TILE_SIZE: f32 = 500.0;
pub const DEFAULT_RESOLUTION: usize = 129; // 2^7 + 1
pub const DEFAULT_MAX_HEIGHT: f32 = 255.0;

// Where a tile's base elevation comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ElevationMode {
    // All samples zero
    Flat,
    // height_map_<N>.ppm per tile; missing files fall back to flat
    #[default]
    HeightMaps,
    // Diamond-square from a flat start
    Fractal,
}

// How shared tile edges are kept consistent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeamPolicy {
    // Copy the left/top neighbour's edge forward and pin it before synthesis
    #[default]
    Shared,
    // Tiles are generated in isolation; seams may show
    Independent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FractalSettings {
    // Initial stride; None means (resolution - 1) rounded down to a power of two
    pub level: Option<usize>,
    // Initial displacement amplitude, halved every level
    pub range: f32,
    // Also run diamond-square over image-driven tiles
    pub refine_images: bool,
}

impl Default for FractalSettings {
    fn default() -> Self {
        Self {
            level: None,
            range: 40.0,
            refine_images: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetLayout {
    pub root: PathBuf,
    pub blend_dir: PathBuf,
    pub height_dir: PathBuf,
    pub textures: [PathBuf; 4],
}

impl Default for AssetLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from("terrain"),
            blend_dir: PathBuf::from("blend_maps"),
            height_dir: PathBuf::from("height_maps"),
            textures: [
                PathBuf::from("texture_0.ppm"),
                PathBuf::from("texture_1.ppm"),
                PathBuf::from("texture_2.ppm"),
                PathBuf::from("texture_3.ppm"),
            ],
        }
    }
}

impl AssetLayout {
    // `number` is the 1-based flattened tile index: row * width + col + 1
    pub fn blend_map(&self, number: usize) -> PathBuf {
        self.root
            .join(&self.blend_dir)
            .join(format!("blend_map_{number}.ppm"))
    }

    pub fn height_map(&self, number: usize) -> PathBuf {
        self.root
            .join(&self.height_dir)
            .join(format!("height_map_{number}.ppm"))
    }

    pub fn ground_textures(&self) -> [PathBuf; 4] {
        self.textures.clone().map(|t| self.root.join(t))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneryConfig {
    pub width: usize,
    pub height: usize,
    pub tile_size: f32,
    pub resolution: usize,
    pub seed: u64,
    pub max_height: f32,
    pub elevation: ElevationMode,
    pub fractal: FractalSettings,
    pub seams: SeamPolicy,
    pub assets: AssetLayout,
}

impl Default for SceneryConfig {
    fn default() -> Self {
        Self {
            width: 3,
            height: 3,
            tile_size: DEFAULT_TILE_SIZE,
            resolution: DEFAULT_RESOLUTION,
            seed: 2025,
            max_height: DEFAULT_MAX_HEIGHT,
            elevation: ElevationMode::default(),
            fractal: FractalSettings::default(),
            seams: SeamPolicy::default(),
            assets: AssetLayout::default(),
        }
    }
}

impl SceneryConfig {
    // width×height grid of flat tiles, no assets touched
    pub fn flat(width: usize, height: usize, tile_size: f32) -> Self {
        Self {
            width,
            height,
            tile_size,
            elevation: ElevationMode::Flat,
            ..Self::default()
        }
    }

    pub fn fractal(width: usize, height: usize, seed: u64) -> Self {
        Self {
            width,
            height,
            seed,
            elevation: ElevationMode::Fractal,
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: SceneryConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TerrainError::invalid(format!(
                "scenery must have at least one tile, got {}x{}",
                self.width, self.height
            )));
        }
        if self.resolution < 2 {
            return Err(TerrainError::invalid(format!(
                "resolution must be at least 2, got {}",
                self.resolution
            )));
        }
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return Err(TerrainError::invalid(format!(
                "tile_size must be positive, got {}",
                self.tile_size
            )));
        }
        if !(self.max_height.is_finite() && self.max_height > 0.0) {
            return Err(TerrainError::invalid(format!(
                "max_height must be positive, got {}",
                self.max_height
            )));
        }
        if !(self.fractal.range.is_finite() && self.fractal.range >= 0.0) {
            return Err(TerrainError::invalid(format!(
                "fractal range must be non-negative, got {}",
                self.fractal.range
            )));
        }
        if self.fractal.level == Some(0) {
            return Err(TerrainError::invalid("fractal level must be at least 1"));
        }
        Ok(())
    }
}
