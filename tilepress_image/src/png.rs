//! PNG encoding of tiles.

use anyhow::{Result, anyhow};
use image::{
	ExtendedColorType, ImageEncoder, ImageFormat, RgbaImage,
	codecs::png::{CompressionType, FilterType, PngEncoder},
	load_from_memory_with_format,
};

/// Encodes an RGBA raster. `speed` runs from 0 (smallest file) to 100
/// (fastest encode).
pub fn encode(image: &RgbaImage, speed: u8) -> Result<Vec<u8>> {
	let (compression_type, filter_type) = match speed.min(100) {
		0..20 => (CompressionType::Best, FilterType::Adaptive),
		20..40 => (CompressionType::Default, FilterType::Adaptive),
		40..60 => (CompressionType::Default, FilterType::Paeth),
		60..80 => (CompressionType::Default, FilterType::Avg),
		80..90 => (CompressionType::Fast, FilterType::Avg),
		_ => (CompressionType::Fast, FilterType::NoFilter),
	};

	let mut buffer: Vec<u8> = Vec::new();
	PngEncoder::new_with_quality(&mut buffer, compression_type, filter_type).write_image(
		image.as_raw(),
		image.width(),
		image.height(),
		ExtendedColorType::Rgba8,
	)?;
	Ok(buffer)
}

/// Smallest output the encoder can produce.
pub fn encode_best(image: &RgbaImage) -> Result<Vec<u8>> {
	encode(image, 0)
}

pub fn decode(data: &[u8]) -> Result<RgbaImage> {
	load_from_memory_with_format(data, ImageFormat::Png)
		.map(|image| image.to_rgba8())
		.map_err(|e| anyhow!("failed to decode PNG image: {e}"))
}
