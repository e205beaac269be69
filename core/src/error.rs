// Errors surfaced by scenery construction and spatial queries.
// Asset decode failures are not errors here: they degrade to flat data.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    // World position (x, z) lies outside the width×height tile grid
    #[error("position ({x}, {z}) is outside the {width}x{height} tile grid")]
    OutOfBounds {
        x: f32,
        z: f32,
        width: usize,
        height: usize,
    },
}

impl TerrainError {
    pub fn invalid<T: ToString>(msg: T) -> Self {
        TerrainError::InvalidConfig(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TerrainError>;
