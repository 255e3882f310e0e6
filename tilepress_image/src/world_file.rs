//! Six-line world files georeferencing a north-up raster.
//!
//! The lines are, in order: pixel width, rotation about y, rotation about x,
//! pixel height (negative for north-up rasters), and the projected x and y of
//! the **centre** of the top-left pixel.

use anyhow::{Context, Result, bail, ensure};
use std::{
	fmt, fs,
	path::{Path, PathBuf},
};
use tilepress_derive::context;

#[derive(Clone, Copy, PartialEq)]
pub struct WorldFile {
	pub pixel_width: f64,
	pub rotation_y: f64,
	pub rotation_x: f64,
	pub pixel_height: f64,
	pub centre_x: f64,
	pub centre_y: f64,
}

impl WorldFile {
	/// A north-up grid with square pixels of `resolution` whose top-left
	/// corner is at `top_left`.
	///
	/// ```
	/// use tilepress_image::WorldFile;
	///
	/// let world = WorldFile::north_up((1000.0, 2000.0), 2.0);
	/// assert_eq!(world.to_string(), "2\n0\n0\n-2\n1001\n1999\n");
	/// ```
	pub fn north_up(top_left: (f64, f64), resolution: f64) -> WorldFile {
		WorldFile::with_pixel_size(top_left, resolution, -resolution)
	}

	/// Like [`north_up`](Self::north_up) with independent pixel sizes;
	/// `pixel_height` is negative for north-up rasters.
	pub fn with_pixel_size(top_left: (f64, f64), pixel_width: f64, pixel_height: f64) -> WorldFile {
		WorldFile {
			pixel_width,
			rotation_y: 0.0,
			rotation_x: 0.0,
			pixel_height,
			centre_x: top_left.0 + pixel_width / 2.0,
			centre_y: top_left.1 + pixel_height / 2.0,
		}
	}

	/// Projected coordinate of the top-left corner of the raster.
	pub fn top_left(&self) -> (f64, f64) {
		(
			self.centre_x - self.pixel_width / 2.0,
			self.centre_y - self.pixel_height / 2.0,
		)
	}

	pub fn is_rotated(&self) -> bool {
		self.rotation_x != 0.0 || self.rotation_y != 0.0
	}

	/// `[x_min, y_min, x_max, y_max]` covered by a raster of `width` x `height`
	/// pixels. Fails for rotated grids.
	pub fn extent(&self, width: u32, height: u32) -> Result<[f64; 4]> {
		ensure!(!self.is_rotated(), "rotated world files are not supported");
		let (left, top) = self.top_left();
		let right = left + f64::from(width) * self.pixel_width;
		let bottom = top + f64::from(height) * self.pixel_height;
		Ok([left.min(right), bottom.min(top), left.max(right), bottom.max(top)])
	}

	/// Maps projected coordinates to fractional pixel coordinates, where
	/// `(0.0, 0.0)` is the top-left corner of the raster.
	pub fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
		let (left, top) = self.top_left();
		((x - left) / self.pixel_width, (y - top) / self.pixel_height)
	}

	pub fn parse(text: &str) -> Result<WorldFile> {
		let values = text
			.split_whitespace()
			.map(|token| token.parse::<f64>().with_context(|| format!("invalid number '{token}'")))
			.collect::<Result<Vec<f64>>>()?;
		let &[pixel_width, rotation_y, rotation_x, pixel_height, centre_x, centre_y] = values.as_slice() else {
			bail!("a world file has six values, found {}", values.len());
		};
		ensure!(
			pixel_width != 0.0 && pixel_height != 0.0,
			"world file has a zero pixel size"
		);
		Ok(WorldFile {
			pixel_width,
			rotation_y,
			rotation_x,
			pixel_height,
			centre_x,
			centre_y,
		})
	}

	#[context("reading world file '{}'", path.display())]
	pub fn read(path: &Path) -> Result<WorldFile> {
		WorldFile::parse(&fs::read_to_string(path)?)
	}

	#[context("writing world file '{}'", path.display())]
	pub fn write(&self, path: &Path) -> Result<()> {
		fs::write(path, self.to_string())?;
		Ok(())
	}

	/// Conventional sidecar names for `image`: `map.png` → `map.pgw`,
	/// `map.pngw`, `map.wld`.
	pub fn sidecars(image: &Path) -> Vec<PathBuf> {
		let Some(extension) = image.extension().and_then(|e| e.to_str()) else {
			return vec![image.with_extension("wld")];
		};
		let mut candidates = Vec::new();
		let chars: Vec<char> = extension.chars().collect();
		if chars.len() >= 2 {
			candidates.push(image.with_extension(format!("{}{}w", chars[0], chars[chars.len() - 1])));
		}
		candidates.push(image.with_extension(format!("{extension}w")));
		candidates.push(image.with_extension("wld"));
		candidates
	}

	/// The first existing sidecar of `image`.
	pub fn find_sidecar(image: &Path) -> Option<PathBuf> {
		WorldFile::sidecars(image).into_iter().find(|path| path.is_file())
	}
}

impl fmt::Display for WorldFile {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for value in [
			self.pixel_width,
			self.rotation_y,
			self.rotation_x,
			self.pixel_height,
			self.centre_x,
			self.centre_y,
		] {
			writeln!(f, "{value}")?;
		}
		Ok(())
	}
}

impl fmt::Debug for WorldFile {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let (left, top) = self.top_left();
		write!(
			f,
			"WorldFile({} x {} from ({left}, {top}))",
			self.pixel_width, self.pixel_height
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;
	use assert_fs::TempDir;
	use rstest::rstest;

	#[test]
	fn level_world_file_text() {
		let world = WorldFile::north_up((16_805_000.0, -4_021_000.0), 0.5);
		assert_eq!(
			world.to_string(),
			"0.5\n0\n0\n-0.5\n16805000.25\n-4021000.25\n"
		);
	}

	#[test]
	fn corner_and_extent() {
		let world = WorldFile::north_up((100.0, 500.0), 10.0);
		assert_eq!(world.top_left(), (100.0, 500.0));
		assert_eq!(world.extent(30, 20).unwrap(), [100.0, 300.0, 400.0, 500.0]);
		assert_eq!(world.to_pixel(100.0, 500.0), (0.0, 0.0));
		assert_eq!(world.to_pixel(400.0, 300.0), (30.0, 20.0));
	}

	#[test]
	fn parses_and_round_trips_through_disk() -> Result<()> {
		let dir = TempDir::new()?;
		let path = dir.path().join("level.tfw");
		let world = WorldFile::north_up((-20037508.34, 20037508.34), 0.29858214111328125);
		world.write(&path)?;

		let read = WorldFile::read(&path)?;
		assert_eq!(read, world);
		assert_abs_diff_eq!(read.top_left().0, -20037508.34, epsilon = 1e-6);
		Ok(())
	}

	#[rstest]
	#[case("1\n0\n0\n-1\n0\n")]
	#[case("1 0 0 -1 0 0 7")]
	#[case("1\n0\n0\nminus one\n0\n0\n")]
	#[case("0\n0\n0\n-1\n0\n0\n")]
	fn rejects_malformed(#[case] text: &str) {
		assert!(WorldFile::parse(text).is_err());
	}

	#[test]
	fn rotated_grids_have_no_extent() {
		let mut world = WorldFile::north_up((0.0, 0.0), 1.0);
		world.rotation_x = 0.5;
		assert!(world.extent(10, 10).is_err());
	}

	#[test]
	fn sidecar_names() {
		assert_eq!(
			WorldFile::sidecars(Path::new("/maps/sheet.png")),
			vec![
				PathBuf::from("/maps/sheet.pgw"),
				PathBuf::from("/maps/sheet.pngw"),
				PathBuf::from("/maps/sheet.wld")
			]
		);
		assert_eq!(
			WorldFile::sidecars(Path::new("canvas")),
			vec![PathBuf::from("canvas.wld")]
		);
	}
}
