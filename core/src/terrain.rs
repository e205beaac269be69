// A single terrain tile placed on the scenery grid.
use std::path::PathBuf;

use glam::{Mat4, Vec3};
use log::debug;

use crate::diamond_square::{FractalSynthesizer, PinMask};
use crate::heightfield::{HeightField, TerrainVertex};
use crate::image_source::ImageHeightSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: usize,
    pub z: usize,
}

impl TileCoord {
    pub fn new(x: usize, z: usize) -> Self {
        Self { x, z }
    }

    // Per-tile seed: reproducible for a given base seed, distinct per tile
    pub fn tile_seed(&self, base: u64) -> u64 {
        let mut h = base ^ 0x9E37_79B9_7F4A_7C15;
        h = (h ^ self.x as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        h = (h ^ (self.z as u64).rotate_left(32)).wrapping_mul(0x94D0_49BB_1331_11EB);
        h ^ (h >> 31)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractalParams {
    pub seed: u64,
    pub level: Option<usize>,
    pub range: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElevationSource {
    Flat,
    // Height map on disk, optionally refined by diamond-square afterwards
    Image {
        path: PathBuf,
        refine: Option<FractalParams>,
    },
    Fractal(FractalParams),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureSet {
    pub ground: [PathBuf; 4],
    pub blend_map: Option<PathBuf>,
}

// Edge samples copied from already generated neighbours
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedEdges {
    pub left: Option<Vec<f32>>,
    pub top: Option<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TerrainDesc {
    pub coords: TileCoord,
    pub tile_size: f32,
    pub resolution: usize,
    pub max_height: f32,
    pub source: ElevationSource,
    pub textures: TextureSet,
    pub edges: SharedEdges,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    #[default]
    Fill,
    Wireframe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

// Tile indices into the owning scenery; never owning references
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Neighbors {
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub top: Option<usize>,
    pub bottom: Option<usize>,
}

impl Neighbors {
    pub fn get(&self, side: Side) -> Option<usize> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
            Side::Top => self.top,
            Side::Bottom => self.bottom,
        }
    }

    fn slot(&mut self, side: Side) -> &mut Option<usize> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
            Side::Top => &mut self.top,
            Side::Bottom => &mut self.bottom,
        }
    }

    pub fn count(&self) -> usize {
        [self.left, self.right, self.top, self.bottom]
            .iter()
            .filter(|n| n.is_some())
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderHandle(pub u32);

// Everything a renderer needs to draw one tile
#[derive(Debug, Clone, Copy)]
pub struct TileDrawData<'a> {
    pub placement: Mat4,
    pub vertices: &'a [TerrainVertex],
    pub indices: &'a [u32],
    pub blend_weights: &'a [[f32; 4]],
    pub min_height: f32,
    pub max_height: f32,
    pub textures: &'a TextureSet,
    pub draw_mode: DrawMode,
}

pub trait TerrainRenderer {
    fn draw_tile(&mut self, shader: ShaderHandle, tile: TileDrawData<'_>);
}

#[derive(Debug, Clone)]
pub struct Terrain {
    coords: TileCoord,
    translation: Vec3,
    placement: Mat4,
    field: HeightField,
    textures: TextureSet,
    blend_weights: Vec<[f32; 4]>,
    draw_mode: DrawMode,
    neighbors: Neighbors,
}

impl Terrain {
    pub fn new(desc: &TerrainDesc) -> Self {
        let mut field = HeightField::new(desc.resolution, desc.tile_size);

        let refine = match &desc.source {
            ElevationSource::Flat => None,
            ElevationSource::Image { path, refine } => {
                let src = ImageHeightSource::load(path);
                if !src.is_empty() {
                    field.edit().fill_with(|col, row| {
                        src.elevation_at(col as isize, row as isize, desc.max_height)
                    });
                }
                refine.as_ref().map(|p| (*p, false))
            }
            ElevationSource::Fractal(p) => Some((*p, true)),
        };

        let pins = Self::copy_edges(&mut field, &desc.edges);

        if let Some((params, seed_corners)) = refine {
            let report = FractalSynthesizer::new(params.seed)
                .with_level(params.level)
                .with_range(params.range)
                .with_corner_seeding(seed_corners)
                .synthesize_pinned(&mut field, &pins);
            debug!(
                "tile ({}, {}): {} levels, {} samples displaced",
                desc.coords.x,
                desc.coords.z,
                report.levels.len(),
                report.writes()
            );
        }

        let blend_weights = match &desc.textures.blend_map {
            Some(path) => {
                let map = ImageHeightSource::load(path);
                field
                    .tex_coords()
                    .iter()
                    .map(|t| map.blend_weights_at(t.x, t.y))
                    .collect()
            }
            None => vec![[1.0, 0.0, 0.0, 0.0]; field.elevations().len()],
        };

        let translation = Vec3::new(
            desc.coords.x as f32 * desc.tile_size,
            0.0,
            desc.coords.z as f32 * desc.tile_size,
        );

        Self {
            coords: desc.coords,
            translation,
            placement: Mat4::from_translation(translation),
            field,
            textures: desc.textures.clone(),
            blend_weights,
            draw_mode: DrawMode::Fill,
            neighbors: Neighbors::default(),
        }
    }

    // Flat tile with no textures
    pub fn flat(coords: TileCoord, tile_size: f32, resolution: usize) -> Self {
        Self::new(&TerrainDesc {
            coords,
            tile_size,
            resolution,
            max_height: crate::config::DEFAULT_MAX_HEIGHT,
            source: ElevationSource::Flat,
            textures: TextureSet::default(),
            edges: SharedEdges::default(),
        })
    }

    // Writes the shared edges into the field and pins them
    fn copy_edges(field: &mut HeightField, edges: &SharedEdges) -> PinMask {
        let n = field.resolution();
        let mut pins = PinMask::none(n);
        let left = edges.left.as_ref().filter(|e| e.len() == n);
        let top = edges.top.as_ref().filter(|e| e.len() == n);
        if left.is_none() && top.is_none() {
            return pins;
        }

        let mut edit = field.edit();
        if let Some(left) = left {
            for (row, &h) in left.iter().enumerate() {
                edit.set(0, row as isize, h);
            }
            pins.pin_column(0);
        }
        if let Some(top) = top {
            for (col, &h) in top.iter().enumerate() {
                edit.set(col as isize, 0, h);
            }
            pins.pin_row(0);
        }
        pins
    }

    pub fn coords(&self) -> TileCoord {
        self.coords
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn placement(&self) -> Mat4 {
        self.placement
    }

    pub fn field(&self) -> &HeightField {
        &self.field
    }

    pub fn min_max(&self) -> (f32, f32) {
        self.field.min_max()
    }

    // Elevation at a tile-local position
    pub fn height_at_local(&self, local_x: f32, local_z: f32) -> f32 {
        self.field.height_at(local_x, local_z)
    }

    pub fn textures(&self) -> &TextureSet {
        &self.textures
    }

    pub fn blend_weights(&self) -> &[[f32; 4]] {
        &self.blend_weights
    }

    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    pub fn toggle_draw_mode(&mut self) {
        self.draw_mode = match self.draw_mode {
            DrawMode::Fill => DrawMode::Wireframe,
            DrawMode::Wireframe => DrawMode::Fill,
        };
    }

    pub fn neighbors(&self) -> &Neighbors {
        &self.neighbors
    }

    pub(crate) fn link(&mut self, side: Side, index: usize) {
        *self.neighbors.slot(side) = Some(index);
    }

    pub fn draw<R: TerrainRenderer + ?Sized>(&self, shader: ShaderHandle, renderer: &mut R) {
        let (min_height, max_height) = self.field.min_max();
        renderer.draw_tile(
            shader,
            TileDrawData {
                placement: self.placement,
                vertices: self.field.vertices(),
                indices: self.field.indices(),
                blend_weights: &self.blend_weights,
                min_height,
                max_height,
                textures: &self.textures,
                draw_mode: self.draw_mode,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_source::{encode_elevation, write_ppm};

    fn desc(source: ElevationSource) -> TerrainDesc {
        TerrainDesc {
            coords: TileCoord::new(0, 0),
            tile_size: 64.0,
            resolution: 17,
            max_height: 255.0,
            source,
            textures: TextureSet::default(),
            edges: SharedEdges::default(),
        }
    }

    #[test]
    fn placement_from_grid_coords() {
        let a = Terrain::flat(TileCoord::new(2, 3), 100.0, 5);
        let b = Terrain::flat(TileCoord::new(2, 3), 100.0, 5);
        assert_eq!(a.translation(), Vec3::new(200.0, 0.0, 300.0));
        assert_eq!(a.placement(), Mat4::from_translation(Vec3::new(200.0, 0.0, 300.0)));
        assert_eq!(a.translation().to_array(), b.translation().to_array());
    }

    #[test]
    fn flat_tile_is_zero_everywhere() {
        let t = Terrain::flat(TileCoord::new(0, 0), 100.0, 9);
        for &(x, z) in &[(0.0, 0.0), (12.5, 99.0), (50.0, 50.0), (100.0, 100.0)] {
            assert_eq!(t.height_at_local(x, z), 0.0);
        }
        assert_eq!(t.min_max(), (0.0, 0.0));
        assert_eq!(t.neighbors().count(), 0);
    }

    #[test]
    fn image_tile_reads_height_map() {
        let path = scratch("height_map_1.ppm");

        // 3x3 image on a 17x17 grid: only the top-left corner gets data
        let mut rgb = Vec::new();
        for i in 0..9u32 {
            rgb.extend_from_slice(&encode_elevation(i * 10, 255.0));
        }
        write_ppm(&path, 3, 3, &rgb).unwrap();

        let t = Terrain::new(&desc(ElevationSource::Image {
            path,
            refine: None,
        }));
        let f = t.field();
        assert_eq!(f.sample_elevation(0, 0), 0.0);
        assert_eq!(f.sample_elevation(2, 0), 20.0);
        assert_eq!(f.sample_elevation(1, 2), 70.0);
        assert_eq!(f.sample_elevation(3, 0), 0.0);
        assert_eq!(t.min_max(), (0.0, 80.0));
    }

    #[test]
    fn missing_image_falls_back_to_flat() {
        let t = Terrain::new(&desc(ElevationSource::Image {
            path: PathBuf::from("/nonexistent/height_map_9.ppm"),
            refine: None,
        }));
        assert!(t.field().elevations().iter().all(|&h| h == 0.0));
    }

    #[test]
    fn fractal_tile_respects_shared_edges() {
        let params = FractalParams {
            seed: 77,
            level: None,
            range: 10.0,
        };
        let mut d = desc(ElevationSource::Fractal(params));
        d.edges.left = Some((0..17).map(|i| i as f32).collect());
        d.edges.top = Some(vec![0.0; 17]);
        let t = Terrain::new(&d);
        let f = t.field();
        assert_eq!(f.column(0), (0..17).map(|i| i as f32).collect::<Vec<_>>());
        assert!(f.row(0).iter().all(|&h| h == 0.0));
        assert_ne!(f.sample_elevation(8, 8), 0.0);
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("landscape-terrain-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn blend_map_weights_per_vertex() {
        let path = scratch("blend_map_1.ppm");
        // red, green / blue, black
        let rgb = [255, 0, 0, 0, 255, 0, 0, 0, 255, 0, 0, 0];
        write_ppm(&path, 2, 2, &rgb).unwrap();

        let mut d = desc(ElevationSource::Flat);
        d.resolution = 5;
        d.textures.blend_map = Some(path);
        let t = Terrain::new(&d);
        let w = t.blend_weights();
        assert_eq!(w.len(), 25);
        assert_eq!(w[0], [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(w[4], [0.0, 0.0, 1.0, 0.0]);
        assert_eq!(w[20], [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(w[24], [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn refined_image_tile_keeps_shared_edges() {
        let path = scratch("height_map_refine.ppm");
        let rgb: Vec<u8> = (0..17 * 17).flat_map(|_| encode_elevation(50, 255.0)).collect();
        write_ppm(&path, 17, 17, &rgb).unwrap();

        let params = FractalParams {
            seed: 3,
            level: None,
            range: 10.0,
        };
        let mut d = desc(ElevationSource::Image {
            path: path.clone(),
            refine: Some(params),
        });
        d.edges.left = Some((0..17).map(|i| i as f32).collect());
        d.edges.top = Some(vec![0.0; 17]);
        let refined = Terrain::new(&d);

        let plain = Terrain::new(&desc(ElevationSource::Image { path, refine: None }));
        assert_eq!(plain.field().sample_elevation(8, 8), 50.0);

        let f = refined.field();
        assert_eq!(f.column(0), (0..17).map(|i| i as f32).collect::<Vec<_>>());
        assert!(f.row(0).iter().all(|&h| h == 0.0));
        // untouched corner keeps its decoded value
        assert_eq!(f.sample_elevation(16, 16), 50.0);
        assert_ne!(f.sample_elevation(8, 8), 50.0);
    }

    #[test]
    fn toggle_flips_mode() {
        let mut t = Terrain::flat(TileCoord::new(0, 0), 1.0, 2);
        assert_eq!(t.draw_mode(), DrawMode::Fill);
        t.toggle_draw_mode();
        assert_eq!(t.draw_mode(), DrawMode::Wireframe);
        t.toggle_draw_mode();
        assert_eq!(t.draw_mode(), DrawMode::Fill);
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(ShaderHandle, usize, usize, DrawMode)>,
    }

    impl TerrainRenderer for Recorder {
        fn draw_tile(&mut self, shader: ShaderHandle, tile: TileDrawData<'_>) {
            self.calls
                .push((shader, tile.vertices.len(), tile.indices.len(), tile.draw_mode));
        }
    }

    #[test]
    fn draw_hands_buffers_to_renderer() {
        let t = Terrain::flat(TileCoord::new(1, 0), 10.0, 3);
        let mut r = Recorder::default();
        t.draw(ShaderHandle(4), &mut r);
        assert_eq!(r.calls, vec![(ShaderHandle(4), 9, 24, DrawMode::Fill)]);
        assert_eq!(t.blend_weights().len(), 9);
        assert_eq!(t.blend_weights()[0], [1.0, 0.0, 0.0, 0.0]);
    }
}
