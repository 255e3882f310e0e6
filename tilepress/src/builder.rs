//! Orchestration of a complete build, from source map to MBTiles file.
//!
//! A build runs in strictly ordered phases:
//!
//! 1. plan the pyramid from the map's extent,
//! 2. render the map once, at the finest level's resolution,
//! 3. rasterize all levels concurrently into tile files,
//! 4. compress all tiles in concurrent batches,
//! 5. write the container.
//!
//! The first error of any phase aborts the build and no container is written.
//! Tasks of the failing phase that are already running see a shared
//! [`Cancellation`] and stop at their next tile or batch; the build returns
//! only after all of them have finished.

use anyhow::{Context, Result, anyhow};
use itertools::Itertools;
use std::{
	fmt, fs,
	path::{Path, PathBuf},
	sync::Arc,
};
use tempfile::TempDir;
use tilepress_container::{ContainerRecord, MBTilesWriter, MetadataRecord};
use tilepress_core::{
	BoundingBox, ConcurrencyLimits, DEFAULT_PIXEL_BUDGET, LevelPlan, Pyramid, PyramidError, SourceStage,
	TileAddress, TileIndexer, TilingScheme, ZoomLevel,
};
use tilepress_image::{
	Cancellation, DEFAULT_BATCH_SIZE, LevelRasterizer, MapRenderer, RenderedMap, Resampling, TileCompressor,
	TileOptimizer, WarpEngine, WorkLayout, run_to_completion,
};
use tilepress_derive::context;

/// Everything a build needs besides its collaborators.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildOptions {
	pub name: String,
	pub description: String,
	/// Requested finest zoom level, 10 to 19.
	pub max_zoom: u8,
	pub resampling: Resampling,
	pub batch_size: usize,
	pub limits: ConcurrencyLimits,
	/// Largest level canvas in pixels; bigger pyramids are refused up front.
	pub pixel_budget: u64,
	/// Parent of the work directory; the system temp dir if unset.
	pub temp_dir: Option<PathBuf>,
	pub keep_temp: bool,
}

impl BuildOptions {
	/// Defaults for a container called `name`.
	pub fn new(name: &str) -> BuildOptions {
		BuildOptions {
			name: name.to_string(),
			description: name.to_string(),
			max_zoom: crate::config::DEFAULT_MAX_ZOOM,
			resampling: Resampling::default(),
			batch_size: DEFAULT_BATCH_SIZE,
			limits: ConcurrencyLimits::default(),
			pixel_budget: DEFAULT_PIXEL_BUDGET,
			temp_dir: None,
			keep_temp: false,
		}
	}
}

/// What a finished build wrote.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildSummary {
	pub output: PathBuf,
	pub zoom_min: ZoomLevel,
	pub zoom_max: ZoomLevel,
	pub tile_count: u64,
	/// Geographic bounds as written to the metadata.
	pub bounds: BoundingBox,
}

impl fmt::Display for BuildSummary {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}: {} tiles, zoom {}-{}, bounds {}",
			self.output.display(),
			self.tile_count,
			self.zoom_min,
			self.zoom_max,
			self.bounds.as_string_list()
		)
	}
}

/// Builds tile pyramids with a fixed set of collaborators.
pub struct PyramidBuilder {
	renderer: Arc<dyn MapRenderer>,
	warp: Arc<dyn WarpEngine>,
	compressor: Arc<dyn TileCompressor>,
	options: BuildOptions,
}

impl PyramidBuilder {
	pub fn new(
		renderer: Arc<dyn MapRenderer>,
		warp: Arc<dyn WarpEngine>,
		compressor: Arc<dyn TileCompressor>,
		options: BuildOptions,
	) -> PyramidBuilder {
		PyramidBuilder {
			renderer,
			warp,
			compressor,
			options,
		}
	}

	pub fn options(&self) -> &BuildOptions {
		&self.options
	}

	/// Builds the pyramid and writes it to `output`.
	///
	/// An existing file at `output` is only replaced once the new container
	/// is complete.
	///
	/// # Errors
	///
	/// The root cause is a [`PyramidError`]:
	/// - `InvalidZoom` and `CanvasTooLarge` before the map is rendered,
	/// - `SourceUnavailable` and `GeometryDegenerate` from planning, rendering
	///   and warping,
	/// - `CompressionFailure` and `ContainerWrite` from the last two phases.
	pub async fn build(&self, output: &Path) -> Result<BuildSummary> {
		// before anything touches the source or the disk
		ZoomLevel::requested_max(self.options.max_zoom)?;

		let extent = self
			.renderer
			.extent()
			.map_err(|error| PyramidError::source(SourceStage::Render, format!("{error:#}")))?;
		let pyramid = Pyramid::plan(&TilingScheme::WEB_MERCATOR, &extent.tiling, self.options.max_zoom)?;
		for plan in pyramid.iter() {
			plan.check_pixel_budget(self.options.pixel_budget)?;
		}
		let metadata = MetadataRecord::new(
			&self.options.name,
			&self.options.description,
			extent.geographic,
			pyramid.zoom_min(),
			pyramid.zoom_max(),
		)?;
		log::info!(
			"tiling '{}' for zoom levels {}-{}, {} tiles",
			self.options.name,
			pyramid.zoom_min(),
			pyramid.zoom_max(),
			pyramid.tile_count()
		);

		let work_dir = self.create_work_dir()?;
		let result = self.build_in(work_dir.path(), &pyramid, &metadata, output).await;
		if self.options.keep_temp {
			let kept = work_dir.keep();
			log::info!("kept intermediate files in {kept:?}");
		}
		let tile_count = result?;

		Ok(BuildSummary {
			output: output.to_path_buf(),
			zoom_min: metadata.zoom_min,
			zoom_max: metadata.zoom_max,
			tile_count,
			bounds: metadata.bounds,
		})
	}

	fn create_work_dir(&self) -> Result<TempDir> {
		let mut builder = tempfile::Builder::new();
		builder.prefix("tilepress-");
		let dir = match &self.options.temp_dir {
			Some(parent) => {
				fs::create_dir_all(parent).with_context(|| format!("creating temp dir {parent:?}"))?;
				builder.tempdir_in(parent)
			}
			None => builder.tempdir(),
		}
		.context("creating work directory")?;
		log::debug!("working in {:?}", dir.path());
		Ok(dir)
	}

	#[context("building '{}' into {:?}", self.options.name, output)]
	async fn build_in(
		&self,
		work_dir: &Path,
		pyramid: &Pyramid,
		metadata: &MetadataRecord,
		output: &Path,
	) -> Result<u64> {
		let rendered = self.render(pyramid.render_resolution(), work_dir).await?;
		let cancellation = Cancellation::new();

		let layout = WorkLayout::new(work_dir, &file_stem(&self.options.name));
		let tiles = self.rasterize_levels(pyramid, &rendered, &layout, &cancellation).await?;

		TileOptimizer::new(
			Arc::clone(&self.compressor),
			self.options.batch_size,
			self.options.limits.batches,
		)
		.with_cancellation(cancellation)
		.optimize(tiles.iter().map(|(_, path)| path.clone()).collect())
		.await?;

		let metadata = metadata.clone();
		let output = output.to_path_buf();
		tokio::task::spawn_blocking(move || {
			let records = tiles.into_iter().map(|(address, path)| {
				let data = fs::read(&path).with_context(|| format!("reading tile {path:?}"))?;
				Ok(ContainerRecord::new(address, data))
			});
			MBTilesWriter::write_to_path(&output, &metadata, records)
		})
		.await
		.map_err(|join| anyhow!("container task panicked: {join}"))?
	}

	/// The single render call; finished and on disk before any level starts.
	///
	/// For warp engines working on pixels the map is decoded here, once, and
	/// shared by all level tasks.
	async fn render(&self, resolution: f64, work_dir: &Path) -> Result<RenderedMap> {
		log::info!("rendering map at {resolution:.3} units per pixel");
		let renderer = Arc::clone(&self.renderer);
		let preload = self.warp.reads_pixels();
		let work_dir = work_dir.to_path_buf();
		tokio::task::spawn_blocking(move || {
			let rendered = renderer.render(resolution, &work_dir)?;
			if preload { rendered.preload() } else { Ok(rendered) }
		})
		.await
		.map_err(|join| anyhow!("render task panicked: {join}"))?
		.map_err(|error| PyramidError::source(SourceStage::Render, format!("{error:#}")).into())
	}

	/// Rasterizes every level, at most `limits.levels` at a time, and returns
	/// all tiles sorted by address.
	async fn rasterize_levels(
		&self,
		pyramid: &Pyramid,
		rendered: &RenderedMap,
		layout: &WorkLayout,
		cancellation: &Cancellation,
	) -> Result<Vec<(TileAddress, PathBuf)>> {
		let tasks = pyramid.iter().cloned().map(|plan| {
			let warp = Arc::clone(&self.warp);
			let source = rendered.clone();
			let layout = layout.clone();
			let resampling = self.options.resampling;
			let pixel_budget = self.options.pixel_budget;
			let cancellation = cancellation.clone();
			async move {
				cancellation.check()?;
				tokio::task::spawn_blocking(move || {
					let rasterizer = LevelRasterizer::new(warp.as_ref(), &layout, resampling)
						.with_pixel_budget(pixel_budget)
						.with_cancellation(cancellation);
					rasterize_level(&rasterizer, &plan, &source)
				})
				.await
				.map_err(|join| anyhow!("level task panicked: {join}"))
				.and_then(|result| result)
			}
		});
		let levels = run_to_completion(tasks, self.options.limits.levels, cancellation).await?;

		Ok(levels.into_iter().flatten().sorted_by_key(|(address, _)| *address).collect())
	}
}

fn rasterize_level(
	rasterizer: &LevelRasterizer<'_>,
	plan: &LevelPlan,
	source: &RenderedMap,
) -> Result<Vec<(TileAddress, PathBuf)>> {
	let indexer = TileIndexer::for_level(plan);
	let tiles = rasterizer.rasterize(plan, source)?;
	log::info!("zoom level {}: {} tiles", plan.zoom, tiles.len());
	tiles
		.into_iter()
		.map(|tile| Ok((indexer.address(tile.index)?, tile.path)))
		.collect()
}

/// A file name safe version of the container name.
fn file_stem(name: &str) -> String {
	let stem: String = name
		.chars()
		.map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
		.collect();
	if stem.is_empty() { "tiles".to_string() } else { stem }
}
