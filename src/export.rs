use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::{codecs::png::PngEncoder, ColorType, ImageEncoder};

/// Straight-alpha RGBA8 pixels of a decoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub fn encode_png(width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>> {
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(anyhow!(
            "pixel buffer holds {} bytes, {}x{} RGBA needs {}",
            rgba.len(),
            width,
            height,
            expected
        ));
    }
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(rgba, width, height, ColorType::Rgba8)
        .with_context(|| format!("encode {width}x{height} png"))?;
    Ok(out)
}

pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage> {
    let image = image::load_from_memory(bytes)
        .context("decode image")?
        .to_rgba8();
    let (width, height) = image.dimensions();
    Ok(DecodedImage {
        width,
        height,
        rgba: image.into_raw(),
    })
}

pub fn save_png(path: &Path, png: &[u8]) -> Result<()> {
    fs::write(path, png).with_context(|| format!("write sketch to {}", path.display()))
}
