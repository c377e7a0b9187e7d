use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaintError {
    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Image has no pixels")]
    EmptyImage,

    #[error("Pixel buffer does not match {width}x{height} RGBA dimensions")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("No image loaded")]
    NoImageLoaded,

    #[error("Invalid base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid canvas transform: {0}")]
    InvalidTransform(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No marker numbered {0}")]
    MarkerNotFound(u32),

    #[error("Color reduction failed: {0}")]
    ColorReduction(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PaintError>;
