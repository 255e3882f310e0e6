use anyhow::{Result, ensure};
use std::fmt;
use tilepress_core::{BoundingBox, TileAddress, ZoomLevel};

/// The `metadata` table of a tilepress container.
#[derive(Clone, PartialEq)]
pub struct MetadataRecord {
	pub name: String,
	pub description: String,
	/// Geographic extent of the source map, computed once per build.
	pub bounds: BoundingBox,
	pub zoom_min: ZoomLevel,
	pub zoom_max: ZoomLevel,
}

impl MetadataRecord {
	/// `bounds` must be geographic (WGS84) and the zoom range ordered.
	pub fn new(
		name: &str,
		description: &str,
		bounds: BoundingBox,
		zoom_min: ZoomLevel,
		zoom_max: ZoomLevel,
	) -> Result<MetadataRecord> {
		ensure!(
			bounds.projection().is_wgs84(),
			"container bounds must be geographic, got {}",
			bounds.projection()
		);
		ensure!(zoom_min <= zoom_max, "zoom range {zoom_min}-{zoom_max} is inverted");
		Ok(MetadataRecord {
			name: name.to_string(),
			description: description.to_string(),
			bounds,
			zoom_min,
			zoom_max,
		})
	}

	/// The `(name, value)` rows in the order they are written.
	///
	/// ```
	/// use tilepress_container::MetadataRecord;
	/// use tilepress_core::{BoundingBox, ZoomLevel};
	///
	/// let bounds = BoundingBox::new_wgs84(150.5, -34.0, 151.0, -33.5).unwrap();
	/// let z = |level| ZoomLevel::new(level).unwrap();
	/// let record = MetadataRecord::new("sheet", "sheet", bounds, z(9), z(16)).unwrap();
	/// assert_eq!(record.rows()[5], ("bounds", "150.5,-34,151,-33.5".to_string()));
	/// ```
	pub fn rows(&self) -> Vec<(&'static str, String)> {
		vec![
			("name", self.name.clone()),
			("type", "baselayer".to_string()),
			("version", "1.1".to_string()),
			("description", self.description.clone()),
			("format", "png".to_string()),
			("bounds", self.bounds.as_string_list()),
			("minzoom", self.zoom_min.to_string()),
			("maxzoom", self.zoom_max.to_string()),
		]
	}
}

impl fmt::Debug for MetadataRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MetadataRecord")
			.field("name", &self.name)
			.field("bounds", &self.bounds.as_string_list())
			.field("zoom", &format_args!("{}-{}", self.zoom_min, self.zoom_max))
			.finish_non_exhaustive()
	}
}

/// One row of the `tiles` table.
#[derive(Clone, PartialEq, Eq)]
pub struct ContainerRecord {
	pub address: TileAddress,
	pub data: Vec<u8>,
}

impl ContainerRecord {
	pub fn new(address: TileAddress, data: Vec<u8>) -> ContainerRecord {
		ContainerRecord { address, data }
	}
}

impl fmt::Debug for ContainerRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ContainerRecord({:?}, {} bytes)", self.address, self.data.len())
	}
}
