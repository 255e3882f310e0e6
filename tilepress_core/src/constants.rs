//! The fixed global tiling scheme and the policy constants of the planner.

use crate::ZoomLevel;

/// Edge length of every tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Projection units per pixel at zoom level 0.
pub const BASE_RESOLUTION: f64 = 2.0 * 78271.516;

/// Lower-left corner of the tile grid, identical on both axes.
pub const ORIGIN: f64 = -20_037_508.34;

/// Smallest zoom level a caller may request as the top of the pyramid.
pub const MIN_REQUESTED_ZOOM: u8 = 10;

/// Largest zoom level a caller may request as the top of the pyramid.
pub const MAX_REQUESTED_ZOOM: u8 = 19;

/// The pyramid ends at the first level with fewer tiles than this on both axes.
pub const STOP_TILE_COUNT: u64 = 3;

/// Largest raster, in pixels, a single level may be rendered into by default.
///
/// At four bytes per pixel this is 1 GiB of canvas.
pub const DEFAULT_PIXEL_BUDGET: u64 = 1 << 28;

/// WGS84 semi-major axis in meters, used by the spherical Web Mercator formulas.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Maximum latitude in degrees representable in Web Mercator (`atan(sinh(PI))`).
pub const MAX_LAT: f64 = 85.051_128_779_806_59;

/// Maximum longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Immutable description of the tile grid every pyramid is addressed in.
///
/// There is exactly one scheme in use, [`TilingScheme::WEB_MERCATOR`]; the
/// struct exists so that grid math and container metadata read their numbers
/// from one value instead of scattered constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TilingScheme {
	/// Projection units per pixel at zoom 0.
	pub base_resolution: f64,
	/// Grid origin (lower-left) on both axes, in projection units.
	pub origin: f64,
	/// Tile edge length in pixels.
	pub tile_size: u32,
}

impl TilingScheme {
	pub const WEB_MERCATOR: TilingScheme = TilingScheme {
		base_resolution: BASE_RESOLUTION,
		origin: ORIGIN,
		tile_size: TILE_SIZE,
	};

	/// Projection units per pixel at `zoom`.
	///
	/// ```
	/// use tilepress_core::{TilingScheme, ZoomLevel};
	///
	/// let scheme = TilingScheme::WEB_MERCATOR;
	/// assert_eq!(scheme.resolution(ZoomLevel::new(1).unwrap()), 78271.516);
	/// ```
	pub fn resolution(&self, zoom: ZoomLevel) -> f64 {
		self.base_resolution / f64::from(1u32 << zoom.get())
	}

	/// Width of one tile in projection units at `zoom`.
	pub fn tile_span(&self, zoom: ZoomLevel) -> f64 {
		self.resolution(zoom) * f64::from(self.tile_size)
	}

	/// Number of tiles along one axis of the whole world at `zoom`.
	pub fn tiles_per_axis(&self, zoom: ZoomLevel) -> u64 {
		1u64 << zoom.get()
	}
}

impl Default for TilingScheme {
	fn default() -> Self {
		TilingScheme::WEB_MERCATOR
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_relative_eq;

	#[test]
	fn resolution_halves_per_level() {
		let scheme = TilingScheme::WEB_MERCATOR;
		let z0 = scheme.resolution(ZoomLevel::new(0).unwrap());
		let z10 = scheme.resolution(ZoomLevel::new(10).unwrap());
		assert_eq!(z0, 156543.032);
		assert_relative_eq!(z10 * 1024.0, z0);
	}

	#[test]
	fn tile_span_at_zoom_zero_covers_the_world() {
		let span = TilingScheme::WEB_MERCATOR.tile_span(ZoomLevel::new(0).unwrap());
		assert_relative_eq!(span, 2.0 * -ORIGIN, max_relative = 1e-7);
	}

	#[test]
	fn tiles_per_axis() {
		let scheme = TilingScheme::default();
		assert_eq!(scheme.tiles_per_axis(ZoomLevel::new(0).unwrap()), 1);
		assert_eq!(scheme.tiles_per_axis(ZoomLevel::new(19).unwrap()), 524_288);
	}
}
