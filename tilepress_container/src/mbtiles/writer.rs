//! Write a tile pyramid into an MBTiles (SQLite) database.
//!
//! The schema is the MBTiles 1.1 layout:
//!
//! - `metadata(name TEXT, value TEXT)`
//! - `tiles(zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, tile_data BLOB)`
//!
//! with a unique index on the tile coordinates so that no address can be
//! written twice. Rows are TMS rows, i.e. [`TileAddress::row`] unchanged.
//!
//! The database is built at `<output>.partial` and renamed onto the output
//! path after the transaction commits. Any failure removes the partial file
//! and leaves an existing output untouched.

use crate::{ContainerRecord, MetadataRecord};
use anyhow::{Context, Result};
use r2d2::Pool;
use r2d2_sqlite::{SqliteConnectionManager, rusqlite::params};
use std::{
	ffi::OsString,
	fs,
	path::{Path, PathBuf},
};
use tilepress_core::PyramidError;
use tilepress_derive::context;

/// Writer for MBTiles (SQLite) containers.
pub struct MBTilesWriter {
	pool: Pool<SqliteConnectionManager>,
	partial: PathBuf,
}

impl MBTilesWriter {
	/// Creates an empty database with the tilepress schema at `partial`,
	/// replacing a stale file from an earlier run.
	#[context("creating MBTiles database '{}'", partial.display())]
	fn new(partial: &Path) -> Result<Self> {
		if partial.exists() {
			log::warn!("removing stale {partial:?}");
			fs::remove_file(partial)?;
		}
		let manager = SqliteConnectionManager::file(partial);
		let pool = Pool::builder().max_size(1).build(manager)?;

		pool.get()?.execute_batch(
			"CREATE TABLE metadata (name TEXT, value TEXT);
			CREATE TABLE tiles (zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, tile_data BLOB);
			CREATE UNIQUE INDEX tile_index ON tiles (zoom_level, tile_column, tile_row);",
		)?;

		Ok(MBTilesWriter {
			pool,
			partial: partial.to_path_buf(),
		})
	}

	/// Writes metadata and all tiles within a single transaction.
	///
	/// Reading a tile may fail (its file is loaded lazily); the first error
	/// rolls the transaction back.
	#[context("filling MBTiles database '{}'", self.partial.display())]
	fn fill<I>(&mut self, metadata: &MetadataRecord, tiles: I) -> Result<u64>
	where
		I: IntoIterator<Item = Result<ContainerRecord>>,
	{
		let mut conn = self.pool.get()?;
		let transaction = conn.transaction()?;

		for (name, value) in metadata.rows() {
			transaction.execute(
				"INSERT INTO metadata (name, value) VALUES (?1, ?2)",
				params![name, value],
			)?;
		}

		let mut count = 0u64;
		{
			let mut statement = transaction
				.prepare("INSERT INTO tiles (zoom_level, tile_column, tile_row, tile_data) VALUES (?1, ?2, ?3, ?4)")?;
			for record in tiles {
				let ContainerRecord { address, data } = record?;
				statement
					.execute(params![address.zoom, address.column, address.row, data.as_slice()])
					.with_context(|| format!("inserting tile {address}"))?;
				count += 1;
			}
		}

		transaction.commit()?;
		Ok(count)
	}

	/// Writes a complete container to `path` and returns the number of tiles.
	///
	/// The tiles go into a `.partial` file next to `path` in one transaction,
	/// which is renamed over `path` once committed.
	///
	/// # Errors
	///
	/// [`PyramidError::ContainerWrite`] naming `path` when the database cannot
	/// be created, a tile fails to read or insert, or the rename fails. The
	/// partial file is removed, so a failed write leaves no new file behind
	/// and an existing file at `path` untouched.
	pub fn write_to_path<I>(path: &Path, metadata: &MetadataRecord, tiles: I) -> Result<u64>
	where
		I: IntoIterator<Item = Result<ContainerRecord>>,
	{
		let partial = partial_path(path);
		log::debug!("writing {metadata:?} to {partial:?}");

		let result = MBTilesWriter::new(&partial)
			.and_then(|mut writer| {
				let count = writer.fill(metadata, tiles)?;
				// closes the connection before the file is moved
				drop(writer);
				Ok(count)
			})
			.and_then(|count| {
				fs::rename(&partial, path).with_context(|| format!("moving {partial:?} to {path:?}"))?;
				Ok(count)
			});

		match result {
			Ok(count) => {
				log::info!("wrote {count} tiles to {path:?}");
				Ok(count)
			}
			Err(error) => {
				if partial.exists()
					&& let Err(cleanup) = fs::remove_file(&partial)
				{
					log::error!("failed to remove {partial:?}: {cleanup}");
				}
				Err(PyramidError::ContainerWrite {
					path: path.to_path_buf(),
					message: format!("{error:#}"),
				}
				.into())
			}
		}
	}
}

/// `<output>.partial`, next to the output file.
pub fn partial_path(output: &Path) -> PathBuf {
	let mut name = OsString::from(output.as_os_str());
	name.push(".partial");
	PathBuf::from(name)
}
