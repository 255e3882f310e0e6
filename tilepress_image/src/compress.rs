//! Lossless shrinking of tile files in place.

use crate::{command, png};
use anyhow::{Result, ensure};
use std::{
	ffi::OsString,
	fs,
	path::{Path, PathBuf},
};
use tilepress_derive::context;

/// Compresses a batch of PNG tiles, rewriting each file in place.
///
/// Only success or failure matters to the caller; a failed call may leave
/// any subset of the batch rewritten.
pub trait TileCompressor: Send + Sync {
	fn compress(&self, paths: &[PathBuf]) -> Result<()>;
}

/// Re-encodes tiles in-process at the encoder's best compression.
#[derive(Clone, Copy, Debug, Default)]
pub struct PngRecompressor;

impl PngRecompressor {
	#[context("recompressing '{}'", path.display())]
	fn recompress(path: &Path) -> Result<()> {
		let original = fs::read(path)?;
		let encoded = png::encode_best(&png::decode(&original)?)?;
		if encoded.len() < original.len() {
			fs::write(path, encoded)?;
		}
		Ok(())
	}
}

impl TileCompressor for PngRecompressor {
	fn compress(&self, paths: &[PathBuf]) -> Result<()> {
		paths.iter().try_for_each(|path| PngRecompressor::recompress(path))
	}
}

/// Runs an external optimizer such as `oxipng` once per batch, with the
/// tile paths appended to `args`.
#[derive(Clone, Debug)]
pub struct CommandCompressor {
	program: PathBuf,
	args: Vec<String>,
}

impl CommandCompressor {
	pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> CommandCompressor {
		CommandCompressor {
			program: program.into(),
			args,
		}
	}
}

impl TileCompressor for CommandCompressor {
	#[context("running {} on {} tiles", self.program.display(), paths.len())]
	fn compress(&self, paths: &[PathBuf]) -> Result<()> {
		ensure!(!paths.is_empty(), "empty batch");
		let args = self
			.args
			.iter()
			.map(OsString::from)
			.chain(paths.iter().map(|path| path.clone().into_os_string()));
		command::run(&self.program, args)?;
		Ok(())
	}
}

/// Leaves tiles as the rasterizer wrote them.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCompression;

impl TileCompressor for NoCompression {
	fn compress(&self, _paths: &[PathBuf]) -> Result<()> {
		Ok(())
	}
}
