//! YAML build configuration.
//!
//! ```yaml
//! name: blue-mountains
//! description: Blue Mountains 1:25k
//! max_zoom: 16
//! source:
//!   image: sheet.png
//!   projection: EPSG:28356
//!   bounds: [150.2, -33.8, 150.5, -33.6]
//! warp:
//!   engine: gdal
//! compression:
//!   engine: command
//!   program: oxipng
//!   args: ["-o", "2", "--strip", "safe"]
//!   batch_size: 16
//! concurrency: 4
//! pixel_budget: 268435456
//! ```
//!
//! Relative paths are resolved against the directory of the config file.
//! Every key is optional; command line flags override the file.

use crate::BuildOptions;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::{
	fs::File,
	io::{BufReader, Read},
	path::{Path, PathBuf},
	sync::Arc,
};
use tilepress_core::{BoundingBox, ConcurrencyLimits, DEFAULT_PIXEL_BUDGET, Projection, ZoomLevel};
use tilepress_image::{
	AffineWarp, CommandCompressor, DEFAULT_BATCH_SIZE, GdalWarp, ImageFileRenderer, NoCompression, PngRecompressor,
	Resampling, TileCompressor, WarpEngine,
};

pub const DEFAULT_MAX_ZOOM: u8 = 16;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
	/// Container name; defaults to the output file stem.
	pub name: Option<String>,

	/// Container description; defaults to the name.
	pub description: Option<String>,

	/// Finest zoom level of the pyramid, 10 to 19. Read as a wide integer so
	/// that out-of-range values fail as an invalid zoom, not as a YAML error.
	#[serde(default = "default_max_zoom")]
	pub max_zoom: i64,

	/// Largest level canvas in pixels; defaults to 2^28.
	pub pixel_budget: Option<u64>,

	#[serde(default)]
	pub source: SourceConfig,

	#[serde(default)]
	pub warp: WarpConfig,

	#[serde(default)]
	pub compression: CompressionConfig,

	/// Worker limit for both parallel phases; defaults to the CPU count.
	pub concurrency: Option<usize>,

	/// Where the work directory is created; defaults to the system temp dir.
	pub temp_dir: Option<PathBuf>,

	/// Keep intermediate files after the build.
	#[serde(default)]
	pub keep_temp: bool,
}

fn default_max_zoom() -> i64 {
	i64::from(DEFAULT_MAX_ZOOM)
}

impl Default for Config {
	fn default() -> Self {
		Config {
			name: None,
			description: None,
			max_zoom: default_max_zoom(),
			pixel_budget: None,
			source: SourceConfig::default(),
			warp: WarpConfig::default(),
			compression: CompressionConfig::default(),
			concurrency: None,
			temp_dir: None,
			keep_temp: false,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
	/// The georeferenced map image.
	pub image: Option<PathBuf>,

	/// World file of the image; defaults to its sidecar.
	pub world_file: Option<PathBuf>,

	/// Projection of the image; defaults to EPSG:3857.
	pub projection: Option<Projection>,

	/// Geographic extent `[west, south, east, north]`; required for
	/// projections other than EPSG:3857 and EPSG:4326.
	pub bounds: Option<[f64; 4]>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum WarpKind {
	/// In-process scaling, for maps already in EPSG:3857
	#[default]
	Affine,
	/// Reprojection with gdalwarp
	Gdal,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WarpConfig {
	#[serde(default)]
	pub engine: WarpKind,

	/// The gdalwarp executable.
	pub program: Option<PathBuf>,

	#[serde(default)]
	pub resampling: Resampling,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum CompressionKind {
	/// Re-encode tiles in-process at best PNG compression
	#[default]
	Png,
	/// Run an external optimizer on each batch
	Command,
	/// Keep tiles as cropped
	None,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CompressionConfig {
	#[serde(default)]
	pub engine: CompressionKind,

	/// Optimizer executable, required for the `command` engine.
	pub program: Option<PathBuf>,

	/// Arguments placed before the tile paths.
	#[serde(default)]
	pub args: Vec<String>,

	/// Tiles per optimizer call.
	#[serde(default = "default_batch_size")]
	pub batch_size: usize,
}

fn default_batch_size() -> usize {
	DEFAULT_BATCH_SIZE
}

impl Default for CompressionConfig {
	fn default() -> Self {
		CompressionConfig {
			engine: CompressionKind::default(),
			program: None,
			args: Vec::new(),
			batch_size: DEFAULT_BATCH_SIZE,
		}
	}
}

impl Config {
	pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
		Ok(serde_yaml_ng::from_reader(reader)?)
	}

	pub fn from_string(text: &str) -> Result<Self> {
		Ok(serde_yaml_ng::from_str(text)?)
	}

	/// Parses a config file and resolves its paths against the file's directory.
	pub fn from_path(path: &Path) -> Result<Self> {
		let file = File::open(path).with_context(|| format!("opening config file {path:?}"))?;
		let mut config =
			Config::from_reader(BufReader::new(file)).with_context(|| format!("parsing config file {path:?}"))?;
		if let Some(base) = path.parent() {
			config.resolve_paths(base);
		}
		Ok(config)
	}

	pub fn resolve_paths(&mut self, base: &Path) {
		let resolve = |path: &mut Option<PathBuf>| {
			if let Some(p) = path
				&& p.is_relative()
			{
				*p = base.join(&*p);
			}
		};
		resolve(&mut self.source.image);
		resolve(&mut self.source.world_file);
		resolve(&mut self.temp_dir);
	}

	/// The renderer for the configured source image.
	pub fn renderer(&self) -> Result<ImageFileRenderer> {
		let image = self.source.image.as_deref().context("no source image configured")?;
		let projection = self.source.projection.clone().unwrap_or_else(Projection::web_mercator);
		let bounds = match self.source.bounds {
			Some([west, south, east, north]) => Some(BoundingBox::new_wgs84(west, south, east, north)?),
			None => None,
		};
		ImageFileRenderer::open(image, self.source.world_file.as_deref(), projection, bounds)
	}

	pub fn warp_engine(&self) -> Arc<dyn WarpEngine> {
		match self.warp.engine {
			WarpKind::Affine => Arc::new(AffineWarp),
			WarpKind::Gdal => Arc::new(match &self.warp.program {
				Some(program) => GdalWarp::new(program.clone()),
				None => GdalWarp::default(),
			}),
		}
	}

	pub fn compressor(&self) -> Result<Arc<dyn TileCompressor>> {
		Ok(match self.compression.engine {
			CompressionKind::Png => Arc::new(PngRecompressor),
			CompressionKind::None => Arc::new(NoCompression),
			CompressionKind::Command => {
				let program = self
					.compression
					.program
					.clone()
					.context("the command compressor needs a program")?;
				Arc::new(CommandCompressor::new(program, self.compression.args.clone()))
			}
		})
	}

	/// Build options for writing to `output`.
	///
	/// Checks the zoom range first, so that an invalid `max_zoom` is reported
	/// before any file is opened.
	///
	/// # Errors
	///
	/// [`PyramidError::InvalidZoom`](tilepress_core::PyramidError::InvalidZoom)
	/// for a `max_zoom` outside `10..=19`, or a plain error for a zero batch
	/// size or budget and an output path without a usable file name.
	pub fn build_options(&self, output: &Path) -> Result<BuildOptions> {
		let max_zoom = ZoomLevel::requested_max(self.max_zoom)?;
		ensure!(self.compression.batch_size > 0, "batch_size must be positive");
		ensure!(self.pixel_budget != Some(0), "pixel_budget must be positive");
		let name = match &self.name {
			Some(name) => name.clone(),
			None => output
				.file_stem()
				.and_then(|stem| stem.to_str())
				.context("cannot derive a name from the output path")?
				.to_string(),
		};
		Ok(BuildOptions {
			description: self.description.clone().unwrap_or_else(|| name.clone()),
			name,
			max_zoom: max_zoom.get(),
			resampling: self.warp.resampling,
			batch_size: self.compression.batch_size,
			limits: self
				.concurrency
				.map_or_else(ConcurrencyLimits::default, ConcurrencyLimits::uniform),
			pixel_budget: self.pixel_budget.unwrap_or(DEFAULT_PIXEL_BUDGET),
			temp_dir: self.temp_dir.clone(),
			keep_temp: self.keep_temp,
		})
	}
}
