//! Resampling the rendered map onto the canvas of one pyramid level.

use crate::{RenderedMap, WorldFile, command};
use anyhow::{Result, bail, ensure};
use image::{RgbaImage, imageops};
use serde::Deserialize;
use std::{
	ffi::OsString,
	fmt,
	path::{Path, PathBuf},
};
use tilepress_core::Projection;
use tilepress_derive::context;

/// Interpolation kernel used when warping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resampling {
	Nearest,
	Bilinear,
	Cubic,
	/// Windowed sinc over 6x6 pixels, the sharpest kernel.
	#[default]
	Lanczos,
}

impl Resampling {
	/// The kernel's name on the `gdalwarp -r` command line.
	pub fn name(self) -> &'static str {
		match self {
			Resampling::Nearest => "near",
			Resampling::Bilinear => "bilinear",
			Resampling::Cubic => "cubic",
			Resampling::Lanczos => "lanczos",
		}
	}

	pub fn filter(self) -> imageops::FilterType {
		match self {
			Resampling::Nearest => imageops::FilterType::Nearest,
			Resampling::Bilinear => imageops::FilterType::Triangle,
			Resampling::Cubic => imageops::FilterType::CatmullRom,
			Resampling::Lanczos => imageops::FilterType::Lanczos3,
		}
	}
}

impl fmt::Display for Resampling {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Destination grid of a warp: one level's canvas in the tiling projection.
#[derive(Clone, Debug, PartialEq)]
pub struct WarpTarget {
	pub zoom: u8,
	pub projection: Projection,
	pub width: u32,
	pub height: u32,
	pub world_file: WorldFile,
	/// Where an engine working on files keeps the canvas.
	pub canvas_path: PathBuf,
	/// The canvas' world file, already written when the engine runs.
	pub world_file_path: PathBuf,
	pub resampling: Resampling,
}

/// Resamples the rendered map onto a level canvas.
///
/// The returned raster has exactly the target's dimensions; pixels the map
/// does not cover stay fully transparent.
pub trait WarpEngine: Send + Sync {
	fn warp(&self, source: &RenderedMap, target: &WarpTarget) -> Result<RgbaImage>;

	/// Whether the engine works on the decoded pixels of the map rather than
	/// on its file. The builder preloads the map once for such engines.
	fn reads_pixels(&self) -> bool {
		true
	}
}

/// In-process warp for maps already in the tiling projection.
///
/// The map is scaled to the level's resolution and placed on the canvas at
/// the nearest whole pixel.
#[derive(Clone, Copy, Debug, Default)]
pub struct AffineWarp;

fn same_projection(a: &Projection, b: &Projection) -> bool {
	a == b || (a.is_web_mercator() && b.is_web_mercator())
}

impl WarpEngine for AffineWarp {
	#[context("warping {:?} onto zoom level {}", source, target.zoom)]
	fn warp(&self, source: &RenderedMap, target: &WarpTarget) -> Result<RgbaImage> {
		if !same_projection(&source.projection, &target.projection) {
			bail!(
				"the affine warp cannot reproject from {} to {}, use the gdal warp engine",
				source.projection,
				target.projection
			);
		}
		ensure!(!source.world_file.is_rotated(), "rotated source maps are not supported");

		let pixels = source.pixels()?;
		let src = &source.world_file;
		let dst = &target.world_file;

		let width = (f64::from(source.width) * src.pixel_width / dst.pixel_width).round() as u32;
		let height = (f64::from(source.height) * src.pixel_height / dst.pixel_height).round() as u32;
		if width == 0 || height == 0 {
			log::warn!("map vanishes at zoom level {}", target.zoom);
			return Ok(RgbaImage::new(target.width, target.height));
		}

		let (src_left, src_top) = src.top_left();
		let (x, y) = dst.to_pixel(src_left, src_top);
		let (x, y) = (x.round() as i64, y.round() as i64);
		log::trace!("placing {width}x{height} map at ({x}, {y}) on zoom level {}", target.zoom);

		let mut canvas = RgbaImage::new(target.width, target.height);
		if (width, height) == pixels.dimensions() {
			imageops::replace(&mut canvas, &*pixels, x, y);
		} else {
			let scaled = imageops::resize(&*pixels, width, height, target.resampling.filter());
			imageops::replace(&mut canvas, &scaled, x, y);
		}
		Ok(canvas)
	}
}

/// Warps with GDAL's `gdalwarp` into a transparent GeoTIFF canvas.
#[derive(Clone, Debug)]
pub struct GdalWarp {
	program: PathBuf,
}

impl GdalWarp {
	pub fn new(program: impl Into<PathBuf>) -> GdalWarp {
		GdalWarp { program: program.into() }
	}

	pub fn program(&self) -> &Path {
		&self.program
	}

	fn arguments(&self, source: &RenderedMap, target: &WarpTarget) -> Vec<OsString> {
		let mut args: Vec<OsString> = [
			"-q",
			"-s_srs",
			source.projection.as_str(),
			"-t_srs",
			target.projection.as_str(),
			"-r",
			target.resampling.name(),
			"-dstalpha",
		]
		.into_iter()
		.map(OsString::from)
		.collect();
		args.push(source.image_path.clone().into_os_string());
		args.push(target.canvas_path.clone().into_os_string());
		args
	}
}

impl Default for GdalWarp {
	fn default() -> Self {
		GdalWarp::new("gdalwarp")
	}
}

impl WarpEngine for GdalWarp {
	#[context("warping {:?} onto zoom level {} with {}", source, target.zoom, self.program.display())]
	fn warp(&self, source: &RenderedMap, target: &WarpTarget) -> Result<RgbaImage> {
		ensure!(
			target.world_file_path == target.canvas_path.with_extension("tfw"),
			"the canvas world file must sit next to the canvas, got {:?}",
			target.world_file_path
		);
		RgbaImage::new(target.width, target.height).save(&target.canvas_path)?;

		command::run(&self.program, self.arguments(source, target))?;

		let canvas = image::open(&target.canvas_path)?.to_rgba8();
		ensure!(
			canvas.dimensions() == (target.width, target.height),
			"gdalwarp resized the canvas to {}x{}",
			canvas.width(),
			canvas.height()
		);
		Ok(canvas)
	}

	fn reads_pixels(&self) -> bool {
		false
	}
}
