//! Image sources and the PNG export surface.

use std::io::Cursor;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbaImage};

use crate::error::{PaintError, Result};

const DATA_URL_MARKER: &str = ";base64,";

fn ensure_not_empty(image: RgbaImage) -> Result<RgbaImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PaintError::EmptyImage);
    }
    Ok(image)
}

/// Build an image from a raw row-major RGBA buffer.
pub fn image_from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<RgbaImage> {
    if width == 0 || height == 0 {
        return Err(PaintError::EmptyImage);
    }
    RgbaImage::from_raw(width, height, pixels)
        .ok_or(PaintError::InvalidDimensions { width, height })
}

/// Decode an encoded image (PNG, JPEG) from memory.
pub fn load_image_from_bytes(bytes: &[u8]) -> Result<RgbaImage> {
    if bytes.is_empty() {
        return Err(PaintError::EmptyImage);
    }
    let image = image::load_from_memory(bytes)?;
    ensure_not_empty(image.to_rgba8())
}

/// Decode a base64 payload, either bare or wrapped in a `data:` URL.
pub fn load_image_from_base64(payload: &str) -> Result<RgbaImage> {
    let encoded = match payload.find(DATA_URL_MARKER) {
        Some(pos) if payload.starts_with("data:") => &payload[pos + DATA_URL_MARKER.len()..],
        _ => payload,
    };
    let bytes = STANDARD.decode(encoded.trim())?;
    load_image_from_bytes(&bytes)
}

/// Load an image file from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbaImage> {
    let image = image::open(path)?;
    ensure_not_empty(image.to_rgba8())
}

/// Encode an image as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Encode an image as a `data:image/png;base64,` URL.
pub fn to_data_url(image: &RgbaImage) -> Result<String> {
    let bytes = encode_png(image)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(bytes)))
}
