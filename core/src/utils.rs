// Top-down preview images of a scenery, for tooling and debugging.
use glam::Vec3;
use palette::{Gradient, LinSrgb};

use crate::heightfield::HeightField;
use crate::scenery::Scenery;

// Light from the north-west, 45° above the horizon
const LIGHT_DIR: Vec3 = Vec3::new(-0.5, 0.70710677, -0.5);

// One pixel per sample, shared tile edges counted once
pub fn preview_size(scenery: &Scenery) -> (usize, usize) {
    let res = scenery
        .tiles()
        .first()
        .map(|t| t.field().resolution())
        .unwrap_or(2);
    (
        scenery.width() * (res - 1) + 1,
        scenery.height() * (res - 1) + 1,
    )
}

// All tiles in one row-major buffer; on shared edges the later tile wins
pub fn composite_heights(scenery: &Scenery) -> Vec<f32> {
    let (w, h) = preview_size(scenery);
    let mut out = vec![0.0f32; w * h];
    for tile in scenery.tiles() {
        let field = tile.field();
        let res = field.resolution();
        let c = tile.coords();
        let (ox, oz) = (c.x * (res - 1), c.z * (res - 1));
        for row in 0..res {
            let src = field.row(row);
            let start = (oz + row) * w + ox;
            out[start..start + res].copy_from_slice(src);
        }
    }
    out
}

// Map [0,1] terrain height to colour, water through snow
fn gradient_color(t: f32) -> [u8; 3] {
    let gradient = Gradient::with_domain(vec![
        (0.00, LinSrgb::new(0.0, 0.0, 0.5)), // deep water
        (0.30, LinSrgb::new(0.8, 0.8, 0.5)), // sand
        (0.50, LinSrgb::new(0.1, 0.6, 0.2)), // grass
        (0.75, LinSrgb::new(0.5, 0.4, 0.3)), // rock
        (1.00, LinSrgb::new(1.0, 1.0, 1.0)), // snow
    ]);
    let col: LinSrgb = gradient.get(t.clamp(0.0, 1.0));
    let rgb = col.into_format::<u8>();
    [rgb.red, rgb.green, rgb.blue]
}

// Per-sample Lambert term from the stored normals
pub fn hillshade(field: &HeightField) -> Vec<f32> {
    let light = LIGHT_DIR.normalize();
    field
        .normals()
        .iter()
        .map(|n| n.dot(light).max(0.0))
        .collect()
}

pub fn scenery_image(scenery: &Scenery) -> Vec<u8> {
    let (w, h) = preview_size(scenery);
    let (min, max) = scenery.min_max();
    let span = (max - min).max(0.001);

    let heights = composite_heights(scenery);
    let mut shade = vec![1.0f32; w * h];
    for tile in scenery.tiles() {
        let field = tile.field();
        let res = field.resolution();
        let c = tile.coords();
        let (ox, oz) = (c.x * (res - 1), c.z * (res - 1));
        for (i, s) in hillshade(field).into_iter().enumerate() {
            let (col, row) = (i % res, i / res);
            shade[(oz + row) * w + ox + col] = s;
        }
    }

    let mut buf = Vec::with_capacity(w * h * 3);
    for (&height, &s) in heights.iter().zip(&shade) {
        let [r, g, b] = gradient_color((height - min) / span);
        let light = (s * 0.5 + 0.5).clamp(0.0, 1.0);
        buf.extend_from_slice(&[
            (r as f32 * light) as u8,
            (g as f32 * light) as u8,
            (b as f32 * light) as u8,
        ]);
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneryConfig;

    #[test]
    fn composite_covers_grid() {
        let mut cfg = SceneryConfig::fractal(3, 2, 1);
        cfg.resolution = 9;
        let s = Scenery::build(&cfg).unwrap();
        assert_eq!(preview_size(&s), (25, 17));

        let heights = composite_heights(&s);
        assert_eq!(heights.len(), 25 * 17);
        // interior sample of tile (2, 1)
        let t = s.tile(2, 1).unwrap().field();
        assert_eq!(heights[(8 + 3) * 25 + 16 + 5], t.sample_elevation(5, 3));

        assert_eq!(scenery_image(&s).len(), 25 * 17 * 3);
    }

    #[test]
    fn flat_ground_is_lit_evenly() {
        let f = HeightField::new(4, 3.0);
        let shade = hillshade(&f);
        assert!(shade.iter().all(|&s| (s - shade[0]).abs() < 1e-6));
        assert!(shade[0] > 0.0);
    }
}
