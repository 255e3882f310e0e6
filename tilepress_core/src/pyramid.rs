//! Planning of the zoom levels a map is tiled at.

use crate::{BoundingBox, LevelPlan, PyramidError, STOP_TILE_COUNT, TilingScheme, ZoomLevel};
use anyhow::{Result, ensure};
use tilepress_derive::context;

/// The ordered levels of a tile pyramid, finest first.
///
/// Planning starts at the requested maximum zoom and walks towards zoom 0,
/// ending with (and including) the first level whose grid has fewer than
/// [`STOP_TILE_COUNT`] tiles on both axes. A pyramid always has at least one
/// level and its zoom levels are strictly decreasing.
#[derive(Clone, Debug, PartialEq)]
pub struct Pyramid {
	levels: Vec<LevelPlan>,
}

impl Pyramid {
	/// Plans the pyramid for `bbox`, which must be in the tiling projection.
	///
	/// # Errors
	///
	/// - [`PyramidError::InvalidZoom`] if `requested_max` is outside `10..=19`,
	///   checked before anything else.
	/// - [`PyramidError::GeometryDegenerate`] if the box has no area or a level
	///   ends up without tiles on some axis.
	/// - A plain error if `bbox` is not in the tiling projection.
	#[context("planning pyramid for {:?} up to zoom {}", bbox, requested_max)]
	pub fn plan(scheme: &TilingScheme, bbox: &BoundingBox, requested_max: u8) -> Result<Pyramid> {
		let top = ZoomLevel::requested_max(requested_max)?;

		ensure!(
			bbox.projection().is_web_mercator(),
			"bounding box must be in the tiling projection, got {}",
			bbox.projection()
		);
		if bbox.is_degenerate() {
			return Err(PyramidError::degenerate(None, format!("bounding box {bbox:?} has zero area")).into());
		}

		let mut levels = Vec::new();
		let mut zoom = Some(top);
		while let Some(z) = zoom {
			let plan = LevelPlan::new(scheme, bbox, z);
			for (axis, range) in [("x", plan.columns), ("y", plan.rows)] {
				if range.is_empty() {
					return Err(PyramidError::degenerate(Some(z.get()), format!("no tiles along the {axis} axis")).into());
				}
			}

			let last = plan.is_smaller_than(STOP_TILE_COUNT);
			levels.push(plan);
			if last {
				break;
			}
			zoom = z.coarser();
		}

		let pyramid = Pyramid { levels };
		log::debug!(
			"planned zoom levels {}-{} with {} tiles",
			pyramid.zoom_min(),
			pyramid.zoom_max(),
			pyramid.tile_count()
		);
		Ok(pyramid)
	}

	pub fn levels(&self) -> &[LevelPlan] {
		&self.levels
	}

	pub fn iter(&self) -> std::slice::Iter<'_, LevelPlan> {
		self.levels.iter()
	}

	pub fn len(&self) -> usize {
		self.levels.len()
	}

	pub fn is_empty(&self) -> bool {
		self.levels.is_empty()
	}

	/// The finest level; the only one rendered directly from the source map.
	pub fn top(&self) -> &LevelPlan {
		&self.levels[0]
	}

	/// The resolution the map renderer is asked for. Every other level is
	/// resampled from that one raster.
	pub fn render_resolution(&self) -> f64 {
		self.top().resolution
	}

	pub fn zoom_max(&self) -> ZoomLevel {
		self.top().zoom
	}

	pub fn zoom_min(&self) -> ZoomLevel {
		self.levels[self.levels.len() - 1].zoom
	}

	pub fn tile_count(&self) -> u64 {
		self.levels.iter().map(LevelPlan::tile_count).sum()
	}
}

impl<'a> IntoIterator for &'a Pyramid {
	type Item = &'a LevelPlan;
	type IntoIter = std::slice::Iter<'a, LevelPlan>;

	fn into_iter(self) -> Self::IntoIter {
		self.levels.iter()
	}
}

impl IntoIterator for Pyramid {
	type Item = LevelPlan;
	type IntoIter = std::vec::IntoIter<LevelPlan>;

	fn into_iter(self) -> Self::IntoIter {
		self.levels.into_iter()
	}
}
