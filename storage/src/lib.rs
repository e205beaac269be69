// storage bakes sceneries into height-map assets plus a JSON manifest

pub mod models;

use std::fs;
use std::path::{Path, PathBuf};

use landscape::config::{AssetLayout, ElevationMode, FractalSettings, SceneryConfig, SeamPolicy};
use landscape::image_source::{encode_elevation, max_encodable, write_ppm};
use landscape::{Scenery, TerrainError};
use log::{info, warn};
use thiserror::Error;

use crate::models::{SceneryManifest, TileRecord};

const MANIFEST: &str = "manifest.json";
const HEIGHT_DIR: &str = "height_maps";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Terrain(#[from] TerrainError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid scenery name {0:?}")]
    InvalidName(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

// <root>/<name>/manifest.json and <root>/<name>/height_maps/height_map_<N>.ppm
pub struct SceneryStore {
    root: PathBuf,
}

impl SceneryStore {
    pub fn init(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn dir(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        if !valid {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    pub fn list_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.path().join(MANIFEST).is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn read_by_name(&self, name: &str) -> Result<Option<SceneryManifest>> {
        let path = self.dir(name)?.join(MANIFEST);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    // Replaces whatever is stored under `name`
    pub fn create(&self, name: &str, scenery: &Scenery) -> Result<SceneryManifest> {
        let config = scenery.config();
        let dir = self.dir(name)?;
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(dir.join(HEIGHT_DIR))?;

        let (offset, _) = scenery.min_max();
        let limit = max_encodable(config.max_height);
        let mut clamped = 0;
        let mut tiles = Vec::with_capacity(scenery.tiles().len());

        for (index, tile) in scenery.tiles().iter().enumerate() {
            let field = tile.field();
            let res = field.resolution();
            let mut rgb = Vec::with_capacity(res * res * 3);
            for &h in field.elevations() {
                let e = (h - offset).round().max(0.0) as u32;
                if e >= limit {
                    clamped += 1;
                }
                rgb.extend_from_slice(&encode_elevation(e, config.max_height));
            }

            let file = format!("{HEIGHT_DIR}/height_map_{}.ppm", index + 1);
            write_ppm(dir.join(&file), res as u32, res as u32, &rgb)?;

            let (min_height, max_height) = tile.min_max();
            let c = tile.coords();
            tiles.push(TileRecord {
                index,
                col: c.x,
                row: c.z,
                height_map: file,
                min_height,
                max_height,
            });
        }

        if clamped > 0 {
            warn!(
                "{} samples of {:?} exceed max_height {} and were clamped",
                clamped, name, config.max_height
            );
        }

        let manifest = SceneryManifest {
            name: name.to_string(),
            seed: config.seed,
            width: scenery.width(),
            height: scenery.height(),
            tile_size: scenery.tile_size(),
            resolution: config.resolution,
            max_height: config.max_height,
            height_offset: offset,
            clamped_samples: clamped,
            tiles,
        };
        fs::write(dir.join(MANIFEST), serde_json::to_string_pretty(&manifest)?)?;
        info!("stored scenery {:?} ({} tiles)", name, manifest.tiles.len());
        Ok(manifest)
    }

    pub fn delete_by_name(&self, name: &str) -> Result<()> {
        let dir = self.dir(name)?;
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }

    // Decoded elevations are relative to height_offset. The baked maps already
    // hold every edge sample, so nothing is copied between tiles on reload.
    pub fn config_for(&self, manifest: &SceneryManifest) -> SceneryConfig {
        SceneryConfig {
            width: manifest.width,
            height: manifest.height,
            tile_size: manifest.tile_size,
            resolution: manifest.resolution,
            seed: manifest.seed,
            max_height: manifest.max_height,
            elevation: ElevationMode::HeightMaps,
            fractal: FractalSettings::default(),
            seams: SeamPolicy::Independent,
            assets: AssetLayout {
                root: self.root.join(&manifest.name),
                height_dir: PathBuf::from(HEIGHT_DIR),
                ..AssetLayout::default()
            },
        }
    }
}
