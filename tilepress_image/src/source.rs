//! The source map and the renderer that rasterizes it.

use crate::WorldFile;
use anyhow::{Context, Result, ensure};
use image::{RgbaImage, imageops::FilterType};
use std::{
	fmt,
	path::{Path, PathBuf},
	sync::Arc,
};
use tilepress_core::{BoundingBox, EARTH_RADIUS, Projection};
use tilepress_derive::context;

/// Extent of the source map in the two projections a build needs.
#[derive(Clone, Debug, PartialEq)]
pub struct MapExtent {
	/// In the tiling projection, drives the pyramid planning.
	pub tiling: BoundingBox,
	/// In WGS84, written as the container bounds.
	pub geographic: BoundingBox,
}

impl MapExtent {
	/// Derives the extent from a box in any projection tilepress can convert.
	pub fn from_bbox(bbox: &BoundingBox) -> Result<MapExtent> {
		if bbox.projection().is_web_mercator() {
			Ok(MapExtent {
				tiling: bbox.clone(),
				geographic: bbox.to_wgs84()?,
			})
		} else {
			ensure!(
				bbox.projection().is_wgs84(),
				"cannot convert {} to the tiling projection, provide geographic bounds",
				bbox.projection()
			);
			Ok(MapExtent {
				tiling: bbox.to_web_mercator()?,
				geographic: bbox.clone(),
			})
		}
	}
}

/// The rasterized source map, written to disk with a world file next to it.
///
/// After [`RenderedMap::preload`] the decoded pixels travel with the map and
/// every clone shares them read-only, so concurrent level warps decode the
/// file once per build instead of once per level.
#[derive(Clone)]
pub struct RenderedMap {
	pub image_path: PathBuf,
	pub world_file_path: PathBuf,
	pub world_file: WorldFile,
	pub projection: Projection,
	pub width: u32,
	pub height: u32,
	pixels: Option<Arc<RgbaImage>>,
}

impl PartialEq for RenderedMap {
	fn eq(&self, other: &Self) -> bool {
		self.image_path == other.image_path
			&& self.world_file_path == other.world_file_path
			&& self.world_file == other.world_file
			&& self.projection == other.projection
			&& (self.width, self.height) == (other.width, other.height)
	}
}

impl RenderedMap {
	/// Writes `image` and its world file into `dir` as `<stem>.png` and `<stem>.pgw`.
	#[context("saving rendered map '{}' to '{}'", stem, dir.display())]
	pub fn save(
		image: &RgbaImage,
		world_file: WorldFile,
		projection: Projection,
		dir: &Path,
		stem: &str,
	) -> Result<RenderedMap> {
		let image_path = dir.join(format!("{stem}.png"));
		let world_file_path = dir.join(format!("{stem}.pgw"));
		image.save(&image_path)?;
		world_file.write(&world_file_path)?;
		Ok(RenderedMap {
			image_path,
			world_file_path,
			world_file,
			projection,
			width: image.width(),
			height: image.height(),
			pixels: None,
		})
	}

	/// Decodes the image file, checking it still has the recorded size.
	#[context("loading rendered map '{}'", self.image_path.display())]
	pub fn load(&self) -> Result<RgbaImage> {
		let image = image::open(&self.image_path)?.to_rgba8();
		ensure!(
			image.dimensions() == (self.width, self.height),
			"expected {}x{} pixels, found {}x{}",
			self.width,
			self.height,
			image.width(),
			image.height()
		);
		Ok(image)
	}

	/// Decodes the image now and keeps the pixels for all clones.
	pub fn preload(mut self) -> Result<RenderedMap> {
		if self.pixels.is_none() {
			self.pixels = Some(Arc::new(self.load()?));
		}
		Ok(self)
	}

	pub fn is_loaded(&self) -> bool {
		self.pixels.is_some()
	}

	/// The decoded pixels: shared when preloaded, decoded on the spot otherwise.
	pub fn pixels(&self) -> Result<Arc<RgbaImage>> {
		match &self.pixels {
			Some(pixels) => Ok(Arc::clone(pixels)),
			None => self.load().map(Arc::new),
		}
	}

	pub fn extent(&self) -> Result<[f64; 4]> {
		self.world_file.extent(self.width, self.height)
	}
}

impl fmt::Debug for RenderedMap {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"RenderedMap({}x{} {} at {:?}{})",
			self.width,
			self.height,
			self.projection,
			self.image_path,
			if self.is_loaded() { ", loaded" } else { "" }
		)
	}
}

/// Produces the single source raster of a build.
pub trait MapRenderer: Send + Sync {
	/// The extent of the whole map; known before anything is rendered.
	fn extent(&self) -> Result<MapExtent>;

	/// Rasterizes the full map at `resolution` (tiling projection units per
	/// pixel) into `work_dir`. Called once per build.
	fn render(&self, resolution: f64, work_dir: &Path) -> Result<RenderedMap>;
}

/// Pixel size in the units of `projection` matching `resolution` tiling
/// projection units. Only geographic degrees need converting.
pub fn native_resolution(projection: &Projection, resolution: f64) -> f64 {
	if projection.is_wgs84() {
		(resolution / EARTH_RADIUS).to_degrees()
	} else {
		resolution
	}
}

/// Renders a map that already exists as a georeferenced image file by
/// resampling it to the requested resolution.
#[derive(Clone, Debug)]
pub struct ImageFileRenderer {
	image_path: PathBuf,
	world_file: WorldFile,
	projection: Projection,
	bounds: Option<BoundingBox>,
	dimensions: (u32, u32),
}

impl ImageFileRenderer {
	/// `world_file` defaults to the image's sidecar (e.g. `map.pgw`).
	/// `bounds` (WGS84) is required when `projection` is neither the tiling
	/// projection nor WGS84.
	#[context("opening source map '{}'", image_path.display())]
	pub fn open(
		image_path: &Path,
		world_file: Option<&Path>,
		projection: Projection,
		bounds: Option<BoundingBox>,
	) -> Result<ImageFileRenderer> {
		let world_file_path = match world_file {
			Some(path) => path.to_path_buf(),
			None => WorldFile::find_sidecar(image_path).with_context(|| {
				format!(
					"no world file found next to the image, tried {:?}",
					WorldFile::sidecars(image_path)
				)
			})?,
		};
		let world_file = WorldFile::read(&world_file_path)?;
		ensure!(!world_file.is_rotated(), "rotated source maps are not supported");

		let dimensions = image::image_dimensions(image_path)?;
		ensure!(dimensions.0 > 0 && dimensions.1 > 0, "source map has no pixels");

		if let Some(bounds) = &bounds {
			ensure!(bounds.projection().is_wgs84(), "source bounds must be geographic");
		}
		log::debug!(
			"source map {image_path:?}: {}x{} pixels in {projection}",
			dimensions.0,
			dimensions.1
		);

		Ok(ImageFileRenderer {
			image_path: image_path.to_path_buf(),
			world_file,
			projection,
			bounds,
			dimensions,
		})
	}

	pub fn projection(&self) -> &Projection {
		&self.projection
	}
}

impl MapRenderer for ImageFileRenderer {
	fn extent(&self) -> Result<MapExtent> {
		if let Some(bounds) = &self.bounds {
			return MapExtent::from_bbox(bounds);
		}
		let [x_min, y_min, x_max, y_max] = self.world_file.extent(self.dimensions.0, self.dimensions.1)?;
		MapExtent::from_bbox(&BoundingBox::new(self.projection.clone(), x_min, y_min, x_max, y_max)?)
	}

	#[context("rendering '{}' at {} units per pixel", self.image_path.display(), resolution)]
	fn render(&self, resolution: f64, work_dir: &Path) -> Result<RenderedMap> {
		ensure!(resolution > 0.0, "resolution must be positive");
		let source = image::open(&self.image_path)?.to_rgba8();
		let (width, height) = source.dimensions();

		let target = native_resolution(&self.projection, resolution);
		let scale_x = self.world_file.pixel_width.abs() / target;
		let scale_y = self.world_file.pixel_height.abs() / target;
		let new_width = ((f64::from(width) * scale_x).round() as u32).max(1);
		let new_height = ((f64::from(height) * scale_y).round() as u32).max(1);

		let (image, world_file) = if (new_width, new_height) == (width, height) {
			(source, self.world_file)
		} else {
			log::info!("resampling source map from {width}x{height} to {new_width}x{new_height} pixels");
			let image = image::imageops::resize(&source, new_width, new_height, FilterType::Lanczos3);
			// keep the covered extent, the pixel size absorbs the rounding
			let world_file = WorldFile::with_pixel_size(
				self.world_file.top_left(),
				self.world_file.pixel_width * f64::from(width) / f64::from(new_width),
				self.world_file.pixel_height * f64::from(height) / f64::from(new_height),
			);
			(image, world_file)
		};

		RenderedMap::save(&image, world_file, self.projection.clone(), work_dir, "source")
	}
}
