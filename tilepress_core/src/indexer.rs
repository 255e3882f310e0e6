//! Addressing of cropped tiles.
//!
//! A level's raster is cropped in raster-scan order starting at the top-left
//! tile. Columns grow eastwards like the raster, but tile rows count from the
//! south, so the scan row has to be flipped.

use crate::LevelPlan;
use anyhow::{Result, ensure};
use std::fmt;

/// Key of one tile in the container. `row` 0 is the southernmost row (TMS).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileAddress {
	pub zoom: u8,
	pub column: u32,
	pub row: u32,
}

impl TileAddress {
	pub fn new(zoom: u8, column: u32, row: u32) -> TileAddress {
		TileAddress { zoom, column, row }
	}
}

impl fmt::Debug for TileAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TileAddress({}, [{}, {}])", self.zoom, self.column, self.row)
	}
}

impl fmt::Display for TileAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}/{}", self.zoom, self.column, self.row)
	}
}

/// Maps raster-scan crop indices of one level to tile addresses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileIndexer {
	zoom: u8,
	low_x: u32,
	count_x: u32,
	high_y: u32,
	count_y: u32,
}

impl TileIndexer {
	pub fn new(zoom: u8, low_x: u32, count_x: u32, high_y: u32, count_y: u32) -> TileIndexer {
		TileIndexer {
			zoom,
			low_x,
			count_x,
			high_y,
			count_y,
		}
	}

	pub fn for_level(plan: &LevelPlan) -> TileIndexer {
		TileIndexer::new(
			plan.zoom.get(),
			plan.columns.low,
			plan.columns.count(),
			plan.rows.high,
			plan.rows.count(),
		)
	}

	pub fn len(&self) -> u64 {
		u64::from(self.count_x) * u64::from(self.count_y)
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Address of the tile cropped at `index`.
	///
	/// ```
	/// use tilepress_core::{TileAddress, TileIndexer};
	///
	/// let indexer = TileIndexer::new(14, 10, 4, 20, 3);
	/// assert_eq!(indexer.address(5).unwrap(), TileAddress::new(14, 11, 18));
	/// ```
	pub fn address(&self, index: u64) -> Result<TileAddress> {
		ensure!(
			index < self.len(),
			"crop index {index} is outside the {}x{} grid of zoom level {}",
			self.count_x,
			self.count_y,
			self.zoom
		);
		let count_x = u64::from(self.count_x);
		let column = self.low_x + (index % count_x) as u32;
		let row = self.high_y - 1 - (index / count_x) as u32;
		Ok(TileAddress::new(self.zoom, column, row))
	}

	/// All addresses of the level in crop order.
	pub fn addresses(&self) -> impl Iterator<Item = TileAddress> + '_ {
		(0..self.count_y).flat_map(move |scan_row| {
			(0..self.count_x)
				.map(move |scan_column| TileAddress::new(self.zoom, self.low_x + scan_column, self.high_y - 1 - scan_row))
		})
	}
}
