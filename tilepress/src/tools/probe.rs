use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use tilepress_container::MBTilesReader;

#[derive(Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// MBTiles file you want to probe
	#[arg(required = true)]
	filename: PathBuf,

	/// also list every tile address
	#[arg(long, short)]
	tiles: bool,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	let reader = MBTilesReader::open_path(&arguments.filename)?;
	print!("{}", report(&reader, arguments.tiles)?);
	Ok(())
}

fn report(reader: &MBTilesReader, with_tiles: bool) -> Result<String> {
	let mut text = String::from("metadata:\n");
	for (name, value) in reader.metadata()? {
		text.push_str(&format!("  {name}: {value}\n"));
	}

	text.push_str(&format!("tiles: {}\n", reader.tile_count()?));
	for (zoom, count) in reader.zoom_counts()? {
		text.push_str(&format!("  zoom {zoom}: {count}\n"));
	}

	if with_tiles {
		for address in reader.tile_addresses()? {
			text.push_str(&format!("  {address}\n"));
		}
	}
	Ok(text)
}
