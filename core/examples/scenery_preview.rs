use std::path::Path;

use glam::Vec3;
use image::RgbImage;
use landscape::utils::{preview_size, scenery_image};
use landscape::{Scenery, SceneryConfig};

// Builds a scenery (from a TOML file if one is given) and writes a
// top-down preview next to it.
fn main() -> landscape::Result<()> {
    env_logger::init();

    let cfg = match std::env::args().nth(1) {
        Some(path) => SceneryConfig::load(path)?,
        None => SceneryConfig::fractal(3, 3, 2025),
    };
    let scenery = Scenery::build(&cfg)?;

    let centre = Vec3::new(
        scenery.width() as f32 * scenery.tile_size() * 0.5,
        0.0,
        scenery.height() as f32 * scenery.tile_size() * 0.5,
    );
    println!("height at scenery centre: {:.2}", scenery.height_at(centre)?);

    let (w, h) = preview_size(&scenery);
    let buf = scenery_image(&scenery);
    let img = RgbImage::from_raw(w as u32, h as u32, buf)
        .ok_or_else(|| landscape::TerrainError::invalid("preview buffer size mismatch"))?;

    let path = Path::new("scenery_preview.png");
    img.save(path)?;
    println!("Saved scenery preview to {:?}", path);
    Ok(())
}
