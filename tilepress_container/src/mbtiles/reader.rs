//! Read back a finished MBTiles container.
//!
//! The reader opens the database read-only and answers the questions the
//! `probe` command and the tests ask: which metadata rows exist, which tile
//! addresses are present, and what a given tile contains.

use anyhow::{Result, ensure};
use r2d2::Pool;
use r2d2_sqlite::{
	SqliteConnectionManager,
	rusqlite::{OpenFlags, OptionalExtension, params},
};
use std::path::{Path, PathBuf};
use tilepress_core::TileAddress;
use tilepress_derive::context;

/// Read-only access to an MBTiles (SQLite) container.
pub struct MBTilesReader {
	path: PathBuf,
	pool: Pool<SqliteConnectionManager>,
}

impl MBTilesReader {
	/// Opens `path` read-only.
	///
	/// # Errors
	///
	/// Fails if `path` is not a file, cannot be opened as SQLite, or has no
	/// `tiles` table to count.
	#[context("opening MBTiles at '{}'", path.display())]
	pub fn open_path(path: &Path) -> Result<MBTilesReader> {
		log::debug!("open {path:?}");
		ensure!(path.is_file(), "file {path:?} does not exist");

		let manager = SqliteConnectionManager::file(path).with_flags(OpenFlags::SQLITE_OPEN_READ_ONLY);
		let pool = Pool::builder().max_size(4).build(manager)?;

		let reader = MBTilesReader {
			path: path.to_path_buf(),
			pool,
		};
		// fails early on files that are not tile containers
		reader.tile_count()?;
		Ok(reader)
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// All `(name, value)` rows of the `metadata` table in insertion order.
	#[context("reading metadata of '{}'", self.path.display())]
	pub fn metadata(&self) -> Result<Vec<(String, String)>> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare("SELECT name, value FROM metadata ORDER BY rowid")?;
		let rows = stmt
			.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
			.collect::<Result<Vec<(String, String)>, _>>()?;
		Ok(rows)
	}

	/// The value of one metadata row, if present.
	#[context("reading metadata '{}' of '{}'", name, self.path.display())]
	pub fn metadata_value(&self, name: &str) -> Result<Option<String>> {
		let conn = self.pool.get()?;
		let value = conn
			.query_row("SELECT value FROM metadata WHERE name = ?1", params![name], |row| {
				row.get(0)
			})
			.optional()?;
		Ok(value)
	}

	#[context("counting tiles of '{}'", self.path.display())]
	pub fn tile_count(&self) -> Result<u64> {
		let conn = self.pool.get()?;
		let count: i64 = conn.query_row("SELECT COUNT(*) FROM tiles", [], |row| row.get(0))?;
		Ok(count as u64)
	}

	/// Number of tiles per zoom level, coarsest first.
	#[context("counting tiles per zoom level of '{}'", self.path.display())]
	pub fn zoom_counts(&self) -> Result<Vec<(u8, u64)>> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare("SELECT zoom_level, COUNT(*) FROM tiles GROUP BY zoom_level ORDER BY zoom_level")?;
		let counts = stmt
			.query_map([], |row| Ok((row.get::<_, u8>(0)?, row.get::<_, i64>(1)? as u64)))?
			.collect::<Result<Vec<_>, _>>()?;
		Ok(counts)
	}

	/// Every tile address in the container, ordered by zoom, column and row.
	#[context("listing tiles of '{}'", self.path.display())]
	pub fn tile_addresses(&self) -> Result<Vec<TileAddress>> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare(
			"SELECT zoom_level, tile_column, tile_row FROM tiles ORDER BY zoom_level, tile_column, tile_row",
		)?;
		let addresses = stmt
			.query_map([], |row| Ok(TileAddress::new(row.get(0)?, row.get(1)?, row.get(2)?)))?
			.collect::<Result<Vec<_>, _>>()?;
		Ok(addresses)
	}

	#[context("reading tile {} of '{}'", address, self.path.display())]
	pub fn tile_data(&self, address: TileAddress) -> Result<Option<Vec<u8>>> {
		let conn = self.pool.get()?;
		let data = conn
			.query_row(
				"SELECT tile_data FROM tiles WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
				params![address.zoom, address.column, address.row],
				|row| row.get(0),
			)
			.optional()?;
		Ok(data)
	}
}

impl std::fmt::Debug for MBTilesReader {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MBTilesReader").field("path", &self.path).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{ContainerRecord, MBTilesWriter, MetadataRecord};
	use assert_fs::NamedTempFile;
	use tilepress_core::{BoundingBox, ZoomLevel};

	fn write_fixture(path: &Path) -> Result<()> {
		let bounds = BoundingBox::new_wgs84(10.0, 50.0, 11.0, 51.0)?;
		let metadata = MetadataRecord::new("fixture", "test fixture", bounds, ZoomLevel::new(9)?, ZoomLevel::new(10)?)?;
		let tiles = [(9, 272, 336), (10, 544, 672), (10, 544, 673), (10, 545, 672)]
			.into_iter()
			.map(|(z, x, y)| Ok(ContainerRecord::new(TileAddress::new(z, x, y), vec![z, 1, 2])));
		MBTilesWriter::write_to_path(path, &metadata, tiles)?;
		Ok(())
	}

	#[test]
	fn reads_counts_and_values() -> Result<()> {
		let file = NamedTempFile::new("fixture.mbtiles")?;
		write_fixture(file.path())?;

		let reader = MBTilesReader::open_path(file.path())?;
		assert_eq!(reader.tile_count()?, 4);
		assert_eq!(reader.zoom_counts()?, vec![(9, 1), (10, 3)]);
		assert_eq!(reader.metadata_value("type")?.as_deref(), Some("baselayer"));
		assert_eq!(reader.metadata_value("bounds")?.as_deref(), Some("10,50,11,51"));
		assert_eq!(reader.metadata_value("attribution")?, None);
		assert_eq!(reader.tile_data(TileAddress::new(9, 272, 336))?, Some(vec![9, 1, 2]));
		assert_eq!(reader.tile_data(TileAddress::new(9, 0, 0))?, None);
		Ok(())
	}

	#[test]
	fn missing_file_is_an_error() {
		let error = MBTilesReader::open_path(Path::new("/definitely/not/here.mbtiles")).unwrap_err();
		assert!(format!("{error:#}").contains("does not exist"));
	}

	#[test]
	fn rejects_files_without_tiles_table() -> Result<()> {
		let file = NamedTempFile::new("empty.mbtiles")?;
		std::fs::write(file.path(), b"")?;
		assert!(MBTilesReader::open_path(file.path()).is_err());
		Ok(())
	}
}
