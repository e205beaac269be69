// PPM (P6) rasters used as height maps and blend maps.
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ExtendedColorType, ImageEncoder, ImageFormat};
use log::{debug, warn};

use crate::error::Result;

// Largest value three 8-bit channels can sum to
pub const MAX_CHANNEL_SUM: u32 = 255 * 3;

// A failed decode is the 0x0 sentinel; every lookup on it returns 0
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageHeightSource {
    width: usize,
    height: usize,
    data: Option<Vec<u8>>,
}

impl ImageHeightSource {
    pub fn from_rgb(width: usize, height: usize, data: Vec<u8>) -> Self {
        if width == 0 || height == 0 || data.len() < width * height * 3 {
            return Self::default();
        }
        Self {
            width,
            height,
            data: Some(data),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(src) => {
                debug!("decoded {} ({}x{})", path.display(), src.width, src.height);
                src
            }
            Err(e) => {
                warn!("could not load ppm {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn try_load(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let rgb = image::load(reader, ImageFormat::Pnm)?.into_rgb8();
        let (w, h) = rgb.dimensions();
        Ok(Self::from_rgb(w as usize, h as usize, rgb.into_raw()))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    pub fn pixel(&self, x: isize, y: isize) -> Option<[u8; 3]> {
        let data = self.data.as_ref()?;
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        let i = (y as usize * self.width + x as usize) * 3;
        Some([data[i], data[i + 1], data[i + 2]])
    }

    // (r + g + b) % max_height, 0 outside the raster
    pub fn elevation_at(&self, x: isize, y: isize, max_height: f32) -> f32 {
        match self.pixel(x, y) {
            Some([r, g, b]) => (r as f32 + g as f32 + b as f32) % max_height,
            None => 0.0,
        }
    }

    // [background, r, g, b]
    pub fn blend_weights_at(&self, u: f32, v: f32) -> [f32; 4] {
        if self.is_empty() {
            return [1.0, 0.0, 0.0, 0.0];
        }
        let x = (u.clamp(0.0, 1.0) * (self.width - 1) as f32).round() as isize;
        let y = (v.clamp(0.0, 1.0) * (self.height - 1) as f32).round() as isize;
        let [r, g, b] = self.pixel(x, y).unwrap_or([0, 0, 0]);
        let (r, g, b) = (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
        [(1.0 - (r + g + b)).max(0.0), r, g, b]
    }
}

// Inverse of elevation_at, clamped to what the channels and max_height can hold
pub fn encode_elevation(value: u32, max_height: f32) -> [u8; 3] {
    let limit = max_encodable(max_height);
    let e = value.min(limit.saturating_sub(1));
    let r = e.min(255);
    let g = (e - r).min(255);
    let b = e - r - g;
    [r as u8, g as u8, b as u8]
}

// Exclusive upper bound on values that survive the modulo round trip
pub fn max_encodable(max_height: f32) -> u32 {
    (max_height.ceil().max(1.0) as u32).min(MAX_CHANNEL_SUM + 1)
}

pub fn write_ppm(path: impl AsRef<Path>, width: u32, height: u32, rgb: &[u8]) -> Result<()> {
    let out = BufWriter::new(File::create(path)?);
    PnmEncoder::new(out)
        .with_subtype(PnmSubtype::Pixmap(SampleEncoding::Binary))
        .write_image(rgb, width, height, ExtendedColorType::Rgb8)?;
    Ok(())
}
