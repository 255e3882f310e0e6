use crate::{MAX_REQUESTED_ZOOM, MIN_REQUESTED_ZOOM, PyramidError};
use anyhow::{Result, ensure};
use std::fmt;

/// A zoom level of the Web Mercator tile grid, `0..=31`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZoomLevel(u8);

impl ZoomLevel {
	/// Deepest level whose tile indices still fit into `u32`.
	pub const DEEPEST: u8 = 31;

	pub fn new(level: u8) -> Result<ZoomLevel> {
		ensure!(level <= Self::DEEPEST, "zoom level ({level}) must be <= {}", Self::DEEPEST);
		Ok(ZoomLevel(level))
	}

	/// Validates the zoom level a caller asked to be the top of the pyramid.
	///
	/// Only `10..=19` is accepted. The input is any integer so that values
	/// read from configuration files or flags, negative ones included, end up
	/// as [`PyramidError::InvalidZoom`] instead of a parse error.
	///
	/// # Errors
	///
	/// [`PyramidError::InvalidZoom`] carrying `level` unchanged.
	///
	/// ```
	/// use tilepress_core::{PyramidError, ZoomLevel};
	///
	/// assert_eq!(ZoomLevel::requested_max(16).unwrap().get(), 16);
	/// assert_eq!(ZoomLevel::requested_max(5), Err(PyramidError::InvalidZoom { zoom: 5 }));
	/// assert_eq!(ZoomLevel::requested_max(-1), Err(PyramidError::InvalidZoom { zoom: -1 }));
	/// ```
	pub fn requested_max(level: impl Into<i64>) -> Result<ZoomLevel, PyramidError> {
		let level = level.into();
		match u8::try_from(level) {
			Ok(zoom) if (MIN_REQUESTED_ZOOM..=MAX_REQUESTED_ZOOM).contains(&zoom) => Ok(ZoomLevel(zoom)),
			_ => Err(PyramidError::InvalidZoom { zoom: level }),
		}
	}

	pub fn get(self) -> u8 {
		self.0
	}

	/// The next coarser level, or `None` at zoom 0.
	pub fn coarser(self) -> Option<ZoomLevel> {
		self.0.checked_sub(1).map(ZoomLevel)
	}
}

impl fmt::Debug for ZoomLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "z{}", self.0)
	}
}

impl fmt::Display for ZoomLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<ZoomLevel> for u8 {
	fn from(zoom: ZoomLevel) -> u8 {
		zoom.0
	}
}
