//! Batched, concurrent compression of all tiles of a build.

use crate::{Cancellation, TileCompressor, run_to_completion};
use anyhow::{Result, anyhow};
use std::{path::PathBuf, sync::Arc};
use tilepress_core::PyramidError;

pub const DEFAULT_BATCH_SIZE: usize = 16;

/// A group of tile files handed to one compressor call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
	pub index: usize,
	pub paths: Vec<PathBuf>,
}

/// Splits `paths` into consecutive batches of at most `batch_size` files.
///
/// ```
/// use std::path::PathBuf;
/// use tilepress_image::partition;
///
/// let paths: Vec<PathBuf> = (0..5).map(|i| PathBuf::from(format!("{i}.png"))).collect();
/// let batches = partition(paths, 2);
/// assert_eq!(batches.iter().map(|b| b.paths.len()).collect::<Vec<_>>(), vec![2, 2, 1]);
/// ```
pub fn partition(paths: Vec<PathBuf>, batch_size: usize) -> Vec<Batch> {
	let batch_size = batch_size.max(1);
	let mut batches = Vec::with_capacity(paths.len().div_ceil(batch_size));
	let mut paths = paths.into_iter().peekable();
	while paths.peek().is_some() {
		batches.push(Batch {
			index: batches.len(),
			paths: paths.by_ref().take(batch_size).collect(),
		});
	}
	batches
}

/// Runs a [`TileCompressor`] over all tiles, one blocking task per batch,
/// with at most `concurrency` batches in flight.
pub struct TileOptimizer {
	compressor: Arc<dyn TileCompressor>,
	batch_size: usize,
	concurrency: usize,
	cancellation: Cancellation,
}

impl TileOptimizer {
	pub fn new(compressor: Arc<dyn TileCompressor>, batch_size: usize, concurrency: usize) -> Self {
		TileOptimizer {
			compressor,
			batch_size: batch_size.max(1),
			concurrency: concurrency.max(1),
			cancellation: Cancellation::new(),
		}
	}

	pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
		self.cancellation = cancellation;
		self
	}

	/// Compresses every tile in place.
	///
	/// # Errors
	///
	/// The first failing batch sets the cancellation and the run fails with
	/// its [`PyramidError::CompressionFailure`]. Batches not yet started are
	/// skipped, running ones are waited for, so no compressor is still
	/// touching the tiles when this returns.
	pub async fn optimize(&self, paths: Vec<PathBuf>) -> Result<()> {
		let tile_count = paths.len();
		let batches = partition(paths, self.batch_size);
		log::info!("optimising {tile_count} tiles in {} batches", batches.len());

		let tasks = batches.into_iter().map(|batch| {
			let compressor = Arc::clone(&self.compressor);
			let cancellation = self.cancellation.clone();
			async move { compress_batch(compressor, batch, &cancellation).await }
		});
		run_to_completion(tasks, self.concurrency, &self.cancellation).await?;
		Ok(())
	}
}

async fn compress_batch(
	compressor: Arc<dyn TileCompressor>,
	batch: Batch,
	cancellation: &Cancellation,
) -> Result<()> {
	cancellation.check()?;
	let Batch { index, paths } = batch;
	let tiles = paths.len();
	let first = paths.first().cloned();

	let result = tokio::task::spawn_blocking(move || compressor.compress(&paths))
		.await
		.map_err(|join| anyhow!("compression task panicked: {join}"))
		.and_then(|result| result);

	result.map_err(|error| {
		log::trace!("batch {index} failed: {error:#}");
		PyramidError::CompressionFailure {
			batch: index,
			tiles,
			first,
			message: format!("{error:#}"),
		}
		.into()
	})
}
