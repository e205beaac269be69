use glam::Vec3;
use log::{debug, info, warn};

use crate::config::{ElevationMode, SceneryConfig, SeamPolicy};
use crate::error::{Result, TerrainError};
use crate::terrain::{
    ElevationSource, FractalParams, SharedEdges, ShaderHandle, Side, Terrain, TerrainDesc,
    TerrainRenderer, TextureSet, TileCoord,
};

// Tiles stored row-major (row * width + col), fixed once built
#[derive(Debug, Clone)]
pub struct Scenery {
    config: SceneryConfig,
    width: usize,
    height: usize,
    tile_size: f32,
    tiles: Vec<Terrain>,
}

impl Scenery {
    // All tiles are generated before any neighbour is linked
    pub fn build(config: &SceneryConfig) -> Result<Self> {
        config.validate()?;
        let mut scenery = Self {
            config: config.clone(),
            width: config.width,
            height: config.height,
            tile_size: config.tile_size,
            tiles: Vec::with_capacity(config.width * config.height),
        };
        scenery.generate_terrains(config);
        scenery.stitch_terrains();

        let (min, max) = scenery.min_max();
        info!(
            "built {}x{} scenery ({:?}, seams {:?}), heights {:.2}..{:.2}",
            scenery.width, scenery.height, config.elevation, config.seams, min, max
        );
        Ok(scenery)
    }

    fn generate_terrains(&mut self, config: &SceneryConfig) {
        let res = config.resolution;
        let mut missing_blend_maps = 0;
        for row in 0..self.height {
            for col in 0..self.width {
                let number = row * self.width + col + 1;
                let coords = TileCoord::new(col, row);

                let fractal = FractalParams {
                    seed: coords.tile_seed(config.seed),
                    level: config.fractal.level,
                    range: config.fractal.range,
                };
                let source = match config.elevation {
                    ElevationMode::Flat => ElevationSource::Flat,
                    ElevationMode::HeightMaps => ElevationSource::Image {
                        path: config.assets.height_map(number),
                        refine: config.fractal.refine_images.then_some(fractal),
                    },
                    ElevationMode::Fractal => ElevationSource::Fractal(fractal),
                };

                // Earlier tiles in row-major order are final; copy their edges forward
                let edges = match config.seams {
                    SeamPolicy::Shared => SharedEdges {
                        left: (col > 0).then(|| self.tiles[number - 2].field().column(res - 1)),
                        top: (row > 0)
                            .then(|| self.tiles[number - 1 - self.width].field().row(res - 1).to_vec()),
                    },
                    SeamPolicy::Independent => SharedEdges::default(),
                };

                // sceneries without blend assets fall back to the background texture
                let blend_map = Some(config.assets.blend_map(number)).filter(|p| p.is_file());
                if blend_map.is_none() {
                    missing_blend_maps += 1;
                }

                let desc = TerrainDesc {
                    coords,
                    tile_size: config.tile_size,
                    resolution: res,
                    max_height: config.max_height,
                    source,
                    textures: TextureSet {
                        ground: config.assets.ground_textures(),
                        blend_map,
                    },
                    edges,
                };
                self.tiles.push(Terrain::new(&desc));
            }
        }
        if missing_blend_maps > 0 {
            debug!(
                "{} of {} tiles have no blend map under {}",
                missing_blend_maps,
                self.tiles.len(),
                config.assets.root.display()
            );
        }
    }

    fn stitch_terrains(&mut self) {
        let w = self.width;
        // left / right
        for row in 0..self.height {
            for col in 0..w - 1 {
                let here = row * w + col;
                self.tiles[here].link(Side::Right, here + 1);
                self.tiles[here + 1].link(Side::Left, here);
            }
        }
        // top / bottom
        for col in 0..w {
            for row in 0..self.height - 1 {
                let here = row * w + col;
                self.tiles[here].link(Side::Bottom, here + w);
                self.tiles[here + w].link(Side::Top, here);
            }
        }
    }

    // The config this scenery was built from
    pub fn config(&self) -> &SceneryConfig {
        &self.config
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn tiles(&self) -> &[Terrain] {
        &self.tiles
    }

    pub fn tile(&self, col: usize, row: usize) -> Option<&Terrain> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.tiles.get(row * self.width + col)
    }

    // Follows a neighbour link of tile `index`
    pub fn neighbor(&self, index: usize, side: Side) -> Option<&Terrain> {
        let link = self.tiles.get(index)?.neighbors().get(side)?;
        self.tiles.get(link)
    }

    // y is ignored; outside the grid is an error, never clamped
    pub fn terrain_index(&self, p: Vec3) -> Result<usize> {
        let fx = p.x / self.tile_size;
        let fz = p.z / self.tile_size;
        let inside =
            fx >= 0.0 && fz >= 0.0 && fx < self.width as f32 && fz < self.height as f32;
        if !inside {
            warn!(
                "query at ({}, {}) outside {}x{} scenery",
                p.x, p.z, self.width, self.height
            );
            return Err(TerrainError::OutOfBounds {
                x: p.x,
                z: p.z,
                width: self.width,
                height: self.height,
            });
        }
        let col = (fx.floor() as usize).min(self.width - 1);
        let row = (fz.floor() as usize).min(self.height - 1);
        Ok(row * self.width + col)
    }

    // Ground elevation under world position `p`
    pub fn height_at(&self, p: Vec3) -> Result<f32> {
        let tile = &self.tiles[self.terrain_index(p)?];
        let origin = tile.translation();
        Ok(tile.height_at_local(p.x - origin.x, p.z - origin.z))
    }

    pub fn min_max(&self) -> (f32, f32) {
        self.tiles.iter().fold((f32::MAX, f32::MIN), |(lo, hi), t| {
            let (min, max) = t.min_max();
            (lo.min(min), hi.max(max))
        })
    }

    pub fn toggle_draw_mode(&mut self) {
        for tile in &mut self.tiles {
            tile.toggle_draw_mode();
        }
    }

    pub fn draw<R: TerrainRenderer + ?Sized>(&self, shader: ShaderHandle, renderer: &mut R) {
        for tile in &self.tiles {
            tile.draw(shader, renderer);
        }
    }
}
