use anyhow::{Result, ensure};
use clap::Args;
use std::{path::PathBuf, sync::Arc};
use tilepress::{
	PyramidBuilder,
	config::{CompressionKind, Config, WarpKind},
};
use tilepress_core::Projection;

#[derive(Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// MBTiles file to write, replaced only when the build succeeds
	#[arg(required = true)]
	output: PathBuf,

	/// YAML build configuration; the flags below override its values
	#[arg(long, short)]
	config: Option<PathBuf>,

	/// georeferenced source map (PNG or TIFF)
	#[arg(long, short)]
	image: Option<PathBuf>,

	/// world file of the map [default: sidecar of the image]
	#[arg(long)]
	world_file: Option<PathBuf>,

	/// projection of the map, e.g. EPSG:28356 [default: EPSG:3857]
	#[arg(long)]
	projection: Option<String>,

	/// geographic extent of the map: west,south,east,north
	#[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
	bounds: Option<Vec<f64>>,

	/// container name [default: output file stem]
	#[arg(long, short)]
	name: Option<String>,

	/// container description [default: name]
	#[arg(long)]
	description: Option<String>,

	/// finest zoom level, 10 to 19 [default: 16]
	#[arg(long, short = 'z', allow_negative_numbers = true)]
	max_zoom: Option<i64>,

	/// warp engine
	#[arg(long, value_enum)]
	warp: Option<WarpKind>,

	/// path of the gdalwarp executable
	#[arg(long)]
	gdalwarp: Option<PathBuf>,

	/// tile compression engine
	#[arg(long, value_enum)]
	compress: Option<CompressionKind>,

	/// optimizer executable for `--compress command`
	#[arg(long)]
	compressor: Option<PathBuf>,

	/// argument for the optimizer, repeatable
	#[arg(long = "compressor-arg", allow_hyphen_values = true)]
	compressor_args: Vec<String>,

	/// largest canvas of a single level in pixels [default: 268435456]
	#[arg(long)]
	pixel_budget: Option<u64>,

	/// tiles per optimizer call [default: 16]
	#[arg(long)]
	batch_size: Option<usize>,

	/// parallel workers [default: number of CPUs]
	#[arg(long, short = 'j')]
	concurrency: Option<usize>,

	/// directory for intermediate files [default: system temp dir]
	#[arg(long)]
	temp_dir: Option<PathBuf>,

	/// keep intermediate files after the build
	#[arg(long)]
	keep_temp: bool,
}

impl Subcommand {
	/// The config file, if any, with all given flags applied on top.
	fn config(&self) -> Result<Config> {
		let mut config = match &self.config {
			Some(path) => Config::from_path(path)?,
			None => Config::default(),
		};

		if let Some(image) = &self.image {
			config.source.image = Some(image.clone());
		}
		if let Some(world_file) = &self.world_file {
			config.source.world_file = Some(world_file.clone());
		}
		if let Some(projection) = &self.projection {
			config.source.projection = Some(Projection::new(projection.as_str()));
		}
		if let Some(bounds) = &self.bounds {
			let &[west, south, east, north] = bounds.as_slice() else {
				anyhow::bail!("--bounds needs four values: west,south,east,north");
			};
			config.source.bounds = Some([west, south, east, north]);
		}
		if let Some(name) = &self.name {
			config.name = Some(name.clone());
		}
		if let Some(description) = &self.description {
			config.description = Some(description.clone());
		}
		if let Some(max_zoom) = self.max_zoom {
			config.max_zoom = max_zoom;
		}
		if let Some(warp) = self.warp {
			config.warp.engine = warp;
		}
		if let Some(program) = &self.gdalwarp {
			config.warp.program = Some(program.clone());
		}
		if let Some(engine) = self.compress {
			config.compression.engine = engine;
		}
		if let Some(program) = &self.compressor {
			config.compression.program = Some(program.clone());
		}
		if !self.compressor_args.is_empty() {
			config.compression.args = self.compressor_args.clone();
		}
		if let Some(pixel_budget) = self.pixel_budget {
			config.pixel_budget = Some(pixel_budget);
		}
		if let Some(batch_size) = self.batch_size {
			config.compression.batch_size = batch_size;
		}
		if let Some(concurrency) = self.concurrency {
			config.concurrency = Some(concurrency);
		}
		if let Some(temp_dir) = &self.temp_dir {
			config.temp_dir = Some(temp_dir.clone());
		}
		config.keep_temp |= self.keep_temp;

		ensure!(
			config.source.image.is_some(),
			"no source map given, use --image or set source.image in the config file"
		);
		Ok(config)
	}
}

#[tokio::main]
pub async fn run(arguments: &Subcommand) -> Result<()> {
	let config = arguments.config()?;
	log::debug!("{config:?}");

	let options = config.build_options(&arguments.output)?;
	let builder = PyramidBuilder::new(
		Arc::new(config.renderer()?),
		config.warp_engine(),
		config.compressor()?,
		options,
	);
	let summary = builder.build(&arguments.output).await?;

	println!("{summary}");
	Ok(())
}
