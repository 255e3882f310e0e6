//! Rasterizing one pyramid level into tile files.

use crate::{Cancellation, RenderedMap, Resampling, WarpEngine, WarpTarget, WorldFile, crop_tiles, png};
use anyhow::{Result, ensure};
use std::{
	fmt, fs,
	path::{Path, PathBuf},
};
use tilepress_core::{DEFAULT_PIXEL_BUDGET, LevelPlan, Projection, PyramidError, SourceStage};
use tilepress_derive::context;

/// Names of the intermediate files of a build inside its work directory.
///
/// Every name carries the zoom level, and tile names also their crop index,
/// so concurrent level tasks never share a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkLayout {
	dir: PathBuf,
	name: String,
}

impl WorkLayout {
	pub fn new(dir: &Path, name: &str) -> WorkLayout {
		WorkLayout {
			dir: dir.to_path_buf(),
			name: name.to_string(),
		}
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// ```
	/// use std::path::{Path, PathBuf};
	/// use tilepress_image::WorkLayout;
	///
	/// let layout = WorkLayout::new(Path::new("/tmp/work"), "sheet");
	/// assert_eq!(layout.tile_path(14, 7), PathBuf::from("/tmp/work/sheet.mbtiles.14.000000007.png"));
	/// ```
	pub fn tile_path(&self, zoom: u8, index: u64) -> PathBuf {
		self.dir.join(format!("{}.mbtiles.{zoom}.{index:09}.png", self.name))
	}

	pub fn canvas_path(&self, zoom: u8) -> PathBuf {
		self.dir.join(format!("{}.mbtiles.{zoom}.tif", self.name))
	}

	pub fn world_file_path(&self, zoom: u8) -> PathBuf {
		self.dir.join(format!("{}.mbtiles.{zoom}.tfw", self.name))
	}
}

/// One cropped tile on disk.
#[derive(Clone, PartialEq, Eq)]
pub struct TileImage {
	pub zoom: u8,
	/// Raster-scan position within the level.
	pub index: u64,
	pub path: PathBuf,
}

impl fmt::Debug for TileImage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TileImage(z{} #{} {:?})", self.zoom, self.index, self.path)
	}
}

/// Turns one [`LevelPlan`] into tile files: world file, warped canvas, crop.
pub struct LevelRasterizer<'a> {
	warp: &'a dyn WarpEngine,
	layout: &'a WorkLayout,
	resampling: Resampling,
	pixel_budget: u64,
	cancellation: Cancellation,
}

impl<'a> LevelRasterizer<'a> {
	pub fn new(warp: &'a dyn WarpEngine, layout: &'a WorkLayout, resampling: Resampling) -> Self {
		LevelRasterizer {
			warp,
			layout,
			resampling,
			pixel_budget: DEFAULT_PIXEL_BUDGET,
			cancellation: Cancellation::new(),
		}
	}

	/// Largest canvas, in pixels, this rasterizer will allocate.
	pub fn with_pixel_budget(mut self, pixel_budget: u64) -> Self {
		self.pixel_budget = pixel_budget;
		self
	}

	pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
		self.cancellation = cancellation;
		self
	}

	/// The warp destination of `plan`, always in the tiling projection.
	///
	/// # Errors
	///
	/// [`PyramidError::CanvasTooLarge`] if the level's canvas exceeds the
	/// pixel budget, or a plain error if it is empty.
	pub fn target(&self, plan: &LevelPlan) -> Result<WarpTarget> {
		let zoom = plan.zoom.get();
		let (width, height) = plan.pixel_dimensions();
		ensure!(
			width > 0 && height > 0,
			"zoom level {zoom} has an empty canvas"
		);
		plan.check_pixel_budget(self.pixel_budget)?;
		Ok(WarpTarget {
			zoom,
			projection: Projection::web_mercator(),
			width: u32::try_from(width)?,
			height: u32::try_from(height)?,
			world_file: WorldFile::north_up(plan.top_left, plan.resolution),
			canvas_path: self.layout.canvas_path(zoom),
			world_file_path: self.layout.world_file_path(zoom),
			resampling: self.resampling,
		})
	}

	/// Rasterizes `plan` from `source` and returns its tiles in crop order.
	///
	/// # Errors
	///
	/// - [`PyramidError::CanvasTooLarge`] before anything is written, see
	///   [`LevelRasterizer::target`].
	/// - [`PyramidError::SourceUnavailable`] if the warp engine fails.
	/// - [`PyramidError::Cancelled`] if the cancellation is set before the warp
	///   or between two tiles; tiles already written stay on disk.
	/// - I/O and encoding errors of the world file and the tiles.
	#[context("rasterizing zoom level {}", plan.zoom)]
	pub fn rasterize(&self, plan: &LevelPlan, source: &RenderedMap) -> Result<Vec<TileImage>> {
		let zoom = plan.zoom.get();
		let target = self.target(plan)?;
		self.cancellation.check()?;
		log::debug!("zoom {zoom}: warping onto {}x{} canvas", target.width, target.height);

		target.world_file.write(&target.world_file_path)?;

		let canvas = self
			.warp
			.warp(source, &target)
			.map_err(|error| PyramidError::source(SourceStage::Warp { zoom }, format!("{error:#}")))?;
		ensure!(
			canvas.dimensions() == (target.width, target.height),
			"warp returned {}x{} pixels instead of {}x{}",
			canvas.width(),
			canvas.height(),
			target.width,
			target.height
		);

		let tiles = crop_tiles(&canvas, plan.tile_size())
			.map(|(index, tile)| {
				self.cancellation.check()?;
				let path = self.layout.tile_path(zoom, index);
				fs::write(&path, png::encode(&tile, 90)?)?;
				Ok(TileImage { zoom, index, path })
			})
			.collect::<Result<Vec<_>>>()?;

		ensure!(
			tiles.len() as u64 == plan.tile_count(),
			"cropped {} tiles, planned {}",
			tiles.len(),
			plan.tile_count()
		);
		log::debug!("zoom {zoom}: cropped {} tiles", tiles.len());
		Ok(tiles)
	}
}
