use crate::{EARTH_RADIUS, MAX_LAT, MAX_LON, Projection};
use anyhow::{Result, ensure};
use std::fmt;
use tilepress_derive::context;

/// A rectangular extent `(x_min, y_min, x_max, y_max)` in a named projection.
///
/// For geographic boxes `x` is longitude and `y` is latitude, so the tuple
/// reads `west, south, east, north`. Boxes are validated on construction and
/// never mutated afterwards.
///
/// ```
/// use tilepress_core::{BoundingBox, Projection};
///
/// let bbox = BoundingBox::new_wgs84(150.0, -34.0, 151.0, -33.0).unwrap();
/// assert_eq!(bbox.as_string_list(), "150,-34,151,-33");
/// assert_eq!(bbox.projection(), &Projection::wgs84());
/// ```
#[derive(Clone, PartialEq)]
pub struct BoundingBox {
	pub x_min: f64,
	pub y_min: f64,
	pub x_max: f64,
	pub y_max: f64,
	projection: Projection,
}

impl BoundingBox {
	pub fn new(projection: Projection, x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Result<BoundingBox> {
		BoundingBox {
			x_min,
			y_min,
			x_max,
			y_max,
			projection,
		}
		.checked()
	}

	pub fn new_wgs84(west: f64, south: f64, east: f64, north: f64) -> Result<BoundingBox> {
		ensure!(
			(-MAX_LON..=MAX_LON).contains(&west) && (-MAX_LON..=MAX_LON).contains(&east),
			"longitudes ({west}, {east}) must be within [-180, 180]"
		);
		ensure!(
			(-90.0..=90.0).contains(&south) && (-90.0..=90.0).contains(&north),
			"latitudes ({south}, {north}) must be within [-90, 90]"
		);
		BoundingBox::new(Projection::wgs84(), west, south, east, north)
	}

	fn checked(self) -> Result<Self> {
		ensure!(
			self.as_array().iter().all(|v| v.is_finite()),
			"bounding box coordinates must be finite: {self:?}"
		);
		ensure!(
			self.x_min <= self.x_max,
			"x_min ({}) must be <= x_max ({})",
			self.x_min,
			self.x_max
		);
		ensure!(
			self.y_min <= self.y_max,
			"y_min ({}) must be <= y_max ({})",
			self.y_min,
			self.y_max
		);
		Ok(self)
	}

	pub fn projection(&self) -> &Projection {
		&self.projection
	}

	pub fn width(&self) -> f64 {
		self.x_max - self.x_min
	}

	pub fn height(&self) -> f64 {
		self.y_max - self.y_min
	}

	/// True when the box has no area.
	pub fn is_degenerate(&self) -> bool {
		self.width() <= 0.0 || self.height() <= 0.0
	}

	/// `[x_min, y_min, x_max, y_max]`
	pub fn as_array(&self) -> [f64; 4] {
		[self.x_min, self.y_min, self.x_max, self.y_max]
	}

	/// The box as `x_min,y_min,x_max,y_max`, i.e. `west,south,east,north` for
	/// geographic boxes. This is the format of the MBTiles `bounds` row.
	pub fn as_string_list(&self) -> String {
		format!("{},{},{},{}", self.x_min, self.y_min, self.x_max, self.y_max)
	}

	/// Projects a WGS84 box to spherical Web Mercator meters.
	///
	/// Latitudes are clamped to ±85.0511°, the limit of the projection.
	#[context("projecting {:?} to Web Mercator", self)]
	pub fn to_web_mercator(&self) -> Result<BoundingBox> {
		ensure!(
			self.projection.is_wgs84(),
			"only WGS84 boxes can be projected, got {}",
			self.projection
		);
		fn x_from_lon(lon: f64) -> f64 {
			EARTH_RADIUS * lon.clamp(-MAX_LON, MAX_LON).to_radians()
		}
		fn y_from_lat(lat: f64) -> f64 {
			let phi = lat.clamp(-MAX_LAT, MAX_LAT).to_radians();
			EARTH_RADIUS * (std::f64::consts::FRAC_PI_4 + phi / 2.0).tan().ln()
		}
		BoundingBox::new(
			Projection::web_mercator(),
			x_from_lon(self.x_min),
			y_from_lat(self.y_min),
			x_from_lon(self.x_max),
			y_from_lat(self.y_max),
		)
	}

	/// Inverse of [`to_web_mercator`](Self::to_web_mercator).
	#[context("unprojecting {:?} to WGS84", self)]
	pub fn to_wgs84(&self) -> Result<BoundingBox> {
		ensure!(
			self.projection.is_web_mercator(),
			"only Web Mercator boxes can be unprojected, got {}",
			self.projection
		);
		fn lon_from_x(x: f64) -> f64 {
			(x / EARTH_RADIUS).to_degrees().clamp(-MAX_LON, MAX_LON)
		}
		fn lat_from_y(y: f64) -> f64 {
			(2.0 * (y / EARTH_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2)
				.to_degrees()
				.clamp(-MAX_LAT, MAX_LAT)
		}
		BoundingBox::new(
			Projection::wgs84(),
			lon_from_x(self.x_min),
			lat_from_y(self.y_min),
			lon_from_x(self.x_max),
			lat_from_y(self.y_max),
		)
	}
}

impl fmt::Debug for BoundingBox {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"BoundingBox[{}]({}, {}, {}, {})",
			self.projection, self.x_min, self.y_min, self.x_max, self.y_max
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;
	use rstest::rstest;

	#[test]
	fn rejects_inverted_and_non_finite() {
		assert!(BoundingBox::new(Projection::web_mercator(), 10.0, 0.0, -10.0, 5.0).is_err());
		assert!(BoundingBox::new(Projection::web_mercator(), 0.0, 5.0, 10.0, -5.0).is_err());
		assert!(BoundingBox::new(Projection::web_mercator(), f64::NAN, 0.0, 1.0, 1.0).is_err());
		assert!(BoundingBox::new_wgs84(-181.0, 0.0, 10.0, 10.0).is_err());
		assert!(BoundingBox::new_wgs84(0.0, -91.0, 10.0, 10.0).is_err());
	}

	#[rstest]
	#[case([0.0, 0.0, 1.0, 1.0], false)]
	#[case([0.0, 0.0, 0.0, 1.0], true)]
	#[case([0.0, 3.0, 1.0, 3.0], true)]
	#[case([5.0, 5.0, 5.0, 5.0], true)]
	fn degenerate_boxes(#[case] v: [f64; 4], #[case] degenerate: bool) {
		let bbox = BoundingBox::new(Projection::web_mercator(), v[0], v[1], v[2], v[3]).unwrap();
		assert_eq!(bbox.is_degenerate(), degenerate);
	}

	#[test]
	fn string_list_uses_shortest_float_repr() {
		let bbox = BoundingBox::new_wgs84(150.25, -34.5, 151.0, -33.125).unwrap();
		assert_eq!(bbox.as_string_list(), "150.25,-34.5,151,-33.125");
	}

	#[rstest]
	#[case([-180.0, -90.0, 180.0, 90.0], [-20037508.34, -20037508.34, 20037508.34, 20037508.34])]
	#[case([-10.0, 40.0, 10.0, 50.0], [-1113194.91, 4865942.28, 1113194.91, 6446275.84])]
	fn projects_to_web_mercator(#[case] geo: [f64; 4], #[case] expected: [f64; 4]) {
		let mercator = BoundingBox::new_wgs84(geo[0], geo[1], geo[2], geo[3])
			.unwrap()
			.to_web_mercator()
			.unwrap();
		assert!(mercator.projection().is_web_mercator());
		for (actual, expected) in mercator.as_array().iter().zip(expected) {
			assert_abs_diff_eq!(*actual, expected, epsilon = 0.01);
		}
	}

	#[test]
	fn round_trips_through_web_mercator() {
		let geo = BoundingBox::new_wgs84(150.5, -34.25, 151.75, -33.0).unwrap();
		let back = geo.to_web_mercator().unwrap().to_wgs84().unwrap();
		for (a, b) in geo.as_array().iter().zip(back.as_array()) {
			assert_abs_diff_eq!(*a, b, epsilon = 1e-9);
		}
	}

	#[test]
	fn projection_requires_matching_source() {
		let mercator = BoundingBox::new(Projection::web_mercator(), 0.0, 0.0, 1.0, 1.0).unwrap();
		assert!(mercator.to_web_mercator().is_err());
		let utm = BoundingBox::new(Projection::new("EPSG:28356"), 0.0, 0.0, 1.0, 1.0).unwrap();
		assert!(utm.to_wgs84().is_err());
	}

	#[test]
	fn debug_format() {
		let bbox = BoundingBox::new_wgs84(-10.0, -5.0, 10.0, 5.0).unwrap();
		assert_eq!(format!("{bbox:?}"), "BoundingBox[EPSG:4326](-10, -5, 10, 5)");
	}
}
