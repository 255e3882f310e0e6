use serde::Deserialize;
use std::fmt;

/// An opaque coordinate reference system identifier.
///
/// The string is handed unchanged to external tools (e.g. `gdalwarp -s_srs`);
/// tilepress itself only needs to recognise Web Mercator and WGS84.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct Projection(String);

impl Projection {
	pub fn new(definition: impl Into<String>) -> Projection {
		Projection(definition.into().trim().to_string())
	}

	/// The tiling projection.
	pub fn web_mercator() -> Projection {
		Projection::new("EPSG:3857")
	}

	/// Geographic coordinates in degrees, used for container bounds.
	pub fn wgs84() -> Projection {
		Projection::new("EPSG:4326")
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// ```
	/// use tilepress_core::Projection;
	///
	/// assert!(Projection::new("epsg:900913").is_web_mercator());
	/// assert!(!Projection::wgs84().is_web_mercator());
	/// ```
	pub fn is_web_mercator(&self) -> bool {
		let code = self.0.to_ascii_uppercase();
		matches!(code.as_str(), "EPSG:3857" | "EPSG:3785" | "EPSG:900913")
			|| (code.contains("+PROJ=MERC") && code.contains("+A=6378137") && code.contains("+B=6378137"))
	}

	pub fn is_wgs84(&self) -> bool {
		let code = self.0.to_ascii_uppercase();
		code == "EPSG:4326" || (code.contains("+PROJ=LONGLAT") && code.contains("+DATUM=WGS84"))
	}
}

impl fmt::Display for Projection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl fmt::Debug for Projection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Projection({})", self.0)
	}
}

impl From<&str> for Projection {
	fn from(definition: &str) -> Self {
		Projection::new(definition)
	}
}
