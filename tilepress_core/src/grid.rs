//! Tile-grid geometry of a single zoom level.
//!
//! For each axis the level covers the tile indices
//!
//! ```text
//! low  = floor((min - origin) / resolution / tile_size)
//! high = ceil ((max - origin) / resolution / tile_size)
//! ```
//!
//! as a half-open range `low..high`. Index `0` is the westernmost column and
//! the southernmost row, so row indices are already TMS rows.
//!
//! Fractional indices closer than [`SNAP_TOLERANCE`] to an integer are taken
//! to be that integer before rounding outward. A box edge lying exactly on a
//! tile boundary therefore stays on that boundary even when the division picks
//! up floating-point noise.

use crate::{BoundingBox, PyramidError, TilingScheme, ZoomLevel};
use std::{fmt, ops::Range};

/// Snapping distance in tiles (a quarter thousandth of a pixel).
pub const SNAP_TOLERANCE: f64 = 1e-6;

fn snapped(value: f64) -> Option<f64> {
	let nearest = value.round();
	((value - nearest).abs() < SNAP_TOLERANCE).then_some(nearest)
}

fn grid_floor(value: f64) -> f64 {
	snapped(value).unwrap_or_else(|| value.floor())
}

fn grid_ceil(value: f64) -> f64 {
	snapped(value).unwrap_or_else(|| value.ceil())
}

/// A half-open range of tile indices on one axis.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisRange {
	pub low: u32,
	pub high: u32,
}

impl AxisRange {
	pub fn new(low: u32, high: u32) -> AxisRange {
		AxisRange {
			low,
			high: high.max(low),
		}
	}

	/// Computes the tile range covering `min..max` on one axis at `zoom`,
	/// clamped to the world grid.
	///
	/// ```
	/// use tilepress_core::{AxisRange, TilingScheme, ZoomLevel};
	///
	/// let z0 = ZoomLevel::new(0).unwrap();
	/// let range = AxisRange::covering(&TilingScheme::WEB_MERCATOR, z0, -20037508.34, 20037508.34);
	/// assert_eq!(range, AxisRange::new(0, 1));
	/// ```
	pub fn covering(scheme: &TilingScheme, zoom: ZoomLevel, min: f64, max: f64) -> AxisRange {
		let span = scheme.tile_span(zoom);
		let low = grid_floor((min - scheme.origin) / span);
		let high = grid_ceil((max - scheme.origin) / span);

		let limit = scheme.tiles_per_axis(zoom) as f64;
		if low < 0.0 || high > limit {
			log::warn!("extent {min}..{max} exceeds the world grid at zoom {zoom}, clamping tiles {low}..{high} to 0..{limit}");
		}
		let clamp = |v: f64| v.clamp(0.0, limit) as u32;
		AxisRange::new(clamp(low), clamp(high))
	}

	pub fn count(&self) -> u32 {
		self.high - self.low
	}

	pub fn is_empty(&self) -> bool {
		self.high == self.low
	}

	pub fn contains(&self, index: u32) -> bool {
		(self.low..self.high).contains(&index)
	}

	pub fn iter(&self) -> Range<u32> {
		self.low..self.high
	}
}

impl fmt::Debug for AxisRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}..{}", self.low, self.high)
	}
}

/// Grid geometry of one pyramid level.
///
/// `top_left` is the projected coordinate of the north-west corner of the
/// level's raster; `x` comes from the lowest column and `y` from the highest
/// row because rows count northwards while pixels count southwards.
#[derive(Clone, PartialEq, Debug)]
pub struct LevelPlan {
	pub zoom: ZoomLevel,
	/// Projection units per pixel.
	pub resolution: f64,
	pub columns: AxisRange,
	pub rows: AxisRange,
	pub top_left: (f64, f64),
	tile_size: u32,
}

impl LevelPlan {
	/// Grid geometry of `bbox` (in the tiling projection) at `zoom`.
	pub fn new(scheme: &TilingScheme, bbox: &BoundingBox, zoom: ZoomLevel) -> LevelPlan {
		let columns = AxisRange::covering(scheme, zoom, bbox.x_min, bbox.x_max);
		let rows = AxisRange::covering(scheme, zoom, bbox.y_min, bbox.y_max);
		let span = scheme.tile_span(zoom);
		let top_left = (
			scheme.origin + f64::from(columns.low) * span,
			scheme.origin + f64::from(rows.high) * span,
		);
		log::trace!("zoom {zoom}: columns {columns:?}, rows {rows:?}, top left {top_left:?}");
		LevelPlan {
			zoom,
			resolution: scheme.resolution(zoom),
			columns,
			rows,
			top_left,
			tile_size: scheme.tile_size,
		}
	}

	pub fn tile_size(&self) -> u32 {
		self.tile_size
	}

	/// Raster size `(width, height)` in pixels, a whole number of tiles.
	pub fn pixel_dimensions(&self) -> (u64, u64) {
		(
			u64::from(self.columns.count()) * u64::from(self.tile_size),
			u64::from(self.rows.count()) * u64::from(self.tile_size),
		)
	}

	/// Checks that the level's raster holds at most `limit` pixels.
	///
	/// # Errors
	///
	/// [`PyramidError::CanvasTooLarge`] naming the zoom level and its size.
	pub fn check_pixel_budget(&self, limit: u64) -> Result<(), PyramidError> {
		let (width, height) = self.pixel_dimensions();
		if width.saturating_mul(height) > limit {
			return Err(PyramidError::CanvasTooLarge {
				zoom: self.zoom.get(),
				width,
				height,
				limit,
			});
		}
		Ok(())
	}

	pub fn tile_count(&self) -> u64 {
		u64::from(self.columns.count()) * u64::from(self.rows.count())
	}

	/// True when both axes have fewer than `limit` tiles.
	pub fn is_smaller_than(&self, limit: u64) -> bool {
		u64::from(self.columns.count()) < limit && u64::from(self.rows.count()) < limit
	}

	/// The projected extent covered by the level's raster.
	pub fn extent(&self) -> [f64; 4] {
		let (width, height) = self.pixel_dimensions();
		let (left, top) = self.top_left;
		[
			left,
			top - height as f64 * self.resolution,
			left + width as f64 * self.resolution,
			top,
		]
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{ORIGIN, Projection};
	use approx::assert_relative_eq;
	use rstest::rstest;

	const SCHEME: TilingScheme = TilingScheme::WEB_MERCATOR;

	fn zoom(level: u8) -> ZoomLevel {
		ZoomLevel::new(level).unwrap()
	}

	fn mercator(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> BoundingBox {
		BoundingBox::new(Projection::web_mercator(), x_min, y_min, x_max, y_max).unwrap()
	}

	#[test]
	fn whole_world_is_one_tile_at_zoom_zero() {
		let plan = LevelPlan::new(&SCHEME, &mercator(ORIGIN, ORIGIN, -ORIGIN, -ORIGIN), zoom(0));
		assert_eq!(plan.columns, AxisRange::new(0, 1));
		assert_eq!(plan.rows, AxisRange::new(0, 1));
		assert_eq!(plan.pixel_dimensions(), (256, 256));
		assert_eq!(plan.top_left.0, ORIGIN);
	}

	#[rstest]
	#[case(12, 2048)]
	#[case(12, 3517)]
	#[case(15, 29_000)]
	#[case(19, 480_123)]
	fn boundary_exact_edges_stay_on_their_index(#[case] level: u8, #[case] k: u32) {
		let span = SCHEME.tile_span(zoom(level));
		let edge = ORIGIN + f64::from(k) * span;

		let starting_on_edge = AxisRange::covering(&SCHEME, zoom(level), edge, edge + 0.5 * span);
		assert_eq!(starting_on_edge, AxisRange::new(k, k + 1));

		let ending_on_edge = AxisRange::covering(&SCHEME, zoom(level), edge - 0.5 * span, edge);
		assert_eq!(ending_on_edge, AxisRange::new(k - 1, k));
	}

	#[rstest]
	#[case(0.25, 10, 11)]
	#[case(0.999, 10, 11)]
	#[case(1.0, 10, 11)]
	#[case(1.001, 10, 12)]
	fn rounds_outwards_off_the_boundary(#[case] tiles: f64, #[case] low: u32, #[case] high: u32) {
		let span = SCHEME.tile_span(zoom(12));
		let min = ORIGIN + 10.0 * span;
		let range = AxisRange::covering(&SCHEME, zoom(12), min, min + tiles * span);
		assert_eq!(range, AxisRange::new(low, high));
	}

	#[test]
	fn just_inside_previous_tile_floors_down() {
		let span = SCHEME.tile_span(zoom(12));
		let min = ORIGIN + 10.0 * span - 0.01 * span;
		assert_eq!(AxisRange::covering(&SCHEME, zoom(12), min, min + span).low, 9);
	}

	#[test]
	fn clamps_to_world_grid() {
		let range = AxisRange::covering(&SCHEME, zoom(2), ORIGIN - 1e6, ORIGIN + 1e6);
		assert_eq!(range, AxisRange::new(0, 1));
		let range = AxisRange::covering(&SCHEME, zoom(2), 1e6, -ORIGIN + 1e7);
		assert_eq!(range, AxisRange::new(2, 4));
	}

	#[test]
	fn level_geometry() {
		// A 3 x 2 tile box at zoom 12, offset from the grid by a quarter tile.
		let z = zoom(12);
		let span = SCHEME.tile_span(z);
		let x0 = ORIGIN + 3000.25 * span;
		let y0 = ORIGIN + 1500.25 * span;
		let plan = LevelPlan::new(&SCHEME, &mercator(x0, y0, x0 + 2.5 * span, y0 + 1.5 * span), z);

		assert_eq!(plan.columns, AxisRange::new(3000, 3003));
		assert_eq!(plan.rows, AxisRange::new(1500, 1502));
		assert_eq!(plan.pixel_dimensions(), (768, 512));
		assert_eq!(plan.tile_count(), 6);
		assert_relative_eq!(plan.resolution, 156543.032 / 4096.0);
		assert_relative_eq!(plan.top_left.0, ORIGIN + 3000.0 * span);
		assert_relative_eq!(plan.top_left.1, ORIGIN + 1502.0 * span);

		let [left, bottom, right, top] = plan.extent();
		assert_relative_eq!(left, plan.top_left.0);
		assert_relative_eq!(top, plan.top_left.1);
		assert_relative_eq!(right - left, 3.0 * span, max_relative = 1e-12);
		assert_relative_eq!(top - bottom, 2.0 * span, max_relative = 1e-12);
	}

	#[test]
	fn pixel_budget_rejects_large_canvases() {
		// The Katoomba 1:25k sheet, about 30 x 26 km.
		let sheet = mercator(16_800_000.0, -4_050_000.0, 16_830_000.0, -4_024_000.0);
		let z16 = LevelPlan::new(&SCHEME, &sheet, zoom(16));
		assert!(z16.check_pixel_budget(crate::DEFAULT_PIXEL_BUDGET).is_ok());

		let z19 = LevelPlan::new(&SCHEME, &sheet, zoom(19));
		let (width, height) = z19.pixel_dimensions();
		assert_eq!(
			z19.check_pixel_budget(crate::DEFAULT_PIXEL_BUDGET),
			Err(PyramidError::CanvasTooLarge {
				zoom: 19,
				width,
				height,
				limit: crate::DEFAULT_PIXEL_BUDGET,
			})
		);

		let (w16, h16) = z16.pixel_dimensions();
		assert!(z16.check_pixel_budget(w16 * h16).is_ok());
		assert!(z16.check_pixel_budget(w16 * h16 - 1).is_err());
	}

	#[test]
	fn stop_rule_needs_both_axes() {
		let z = zoom(12);
		let span = SCHEME.tile_span(z);
		let x0 = ORIGIN + 100.5 * span;
		let wide = LevelPlan::new(&SCHEME, &mercator(x0, x0, x0 + 3.0 * span, x0 + span), z);
		assert!(!wide.is_smaller_than(3));
		let small = LevelPlan::new(&SCHEME, &mercator(x0, x0, x0 + span, x0 + span), z);
		assert!(small.is_smaller_than(3));
	}

	#[test]
	fn axis_range_helpers() {
		let range = AxisRange::new(4, 7);
		assert_eq!(range.count(), 3);
		assert!(range.contains(4) && range.contains(6) && !range.contains(7));
		assert_eq!(range.iter().collect::<Vec<_>>(), vec![4, 5, 6]);
		assert!(AxisRange::new(5, 2).is_empty());
		assert_eq!(format!("{range:?}"), "4..7");
	}
}
