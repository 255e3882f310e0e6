use image::{RgbaImage, imageops};

/// Number of `(columns, rows)` of `tile_size` tiles needed to cover an image.
pub fn tile_grid(width: u32, height: u32, tile_size: u32) -> (u32, u32) {
	(width.div_ceil(tile_size), height.div_ceil(tile_size))
}

/// Crops `canvas` into `tile_size` squares in raster-scan order, starting at
/// the top-left. Tiles reaching past the right or bottom edge are padded with
/// transparent black.
///
/// ```
/// use image::RgbaImage;
/// use tilepress_image::crop_tiles;
///
/// let canvas = RgbaImage::new(300, 256);
/// let tiles: Vec<_> = crop_tiles(&canvas, 256).collect();
/// assert_eq!(tiles.len(), 2);
/// assert_eq!(tiles[1].1.dimensions(), (256, 256));
/// ```
pub fn crop_tiles(canvas: &RgbaImage, tile_size: u32) -> impl Iterator<Item = (u64, RgbaImage)> + '_ {
	let (columns, rows) = tile_grid(canvas.width(), canvas.height(), tile_size);
	(0..rows)
		.flat_map(move |row| (0..columns).map(move |column| (row, column)))
		.enumerate()
		.map(move |(index, (row, column))| (index as u64, crop_tile(canvas, column, row, tile_size)))
}

fn crop_tile(canvas: &RgbaImage, column: u32, row: u32, tile_size: u32) -> RgbaImage {
	let x = column * tile_size;
	let y = row * tile_size;
	let width = tile_size.min(canvas.width() - x);
	let height = tile_size.min(canvas.height() - y);

	let view = imageops::crop_imm(canvas, x, y, width, height);
	if width == tile_size && height == tile_size {
		return view.to_image();
	}
	let mut tile = RgbaImage::new(tile_size, tile_size);
	imageops::replace(&mut tile, &view.to_image(), 0, 0);
	tile
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::Rgba;
	use rstest::rstest;

	/// Every pixel encodes its own position.
	fn numbered(width: u32, height: u32) -> RgbaImage {
		RgbaImage::from_fn(width, height, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, (x / 256) as u8, 255]))
	}

	#[rstest]
	#[case(512, 256, 256, (2, 1))]
	#[case(513, 256, 256, (3, 1))]
	#[case(1, 1, 256, (1, 1))]
	#[case(0, 0, 256, (0, 0))]
	fn grid_size(#[case] width: u32, #[case] height: u32, #[case] tile: u32, #[case] expected: (u32, u32)) {
		assert_eq!(tile_grid(width, height, tile), expected);
	}

	#[test]
	fn raster_scan_order() {
		let canvas = numbered(768, 512);
		let tiles: Vec<(u64, RgbaImage)> = crop_tiles(&canvas, 256).collect();

		assert_eq!(tiles.len(), 6);
		for (expected, (index, tile)) in tiles.iter().enumerate() {
			assert_eq!(*index, expected as u64);
			let (column, row) = (expected as u32 % 3, expected as u32 / 3);
			assert_eq!(tile.get_pixel(0, 0), canvas.get_pixel(column * 256, row * 256));
			assert_eq!(tile.get_pixel(255, 255), canvas.get_pixel(column * 256 + 255, row * 256 + 255));
		}
	}

	#[test]
	fn pads_partial_tiles_with_transparency() {
		let canvas = numbered(300, 260);
		let tiles: Vec<(u64, RgbaImage)> = crop_tiles(&canvas, 256).collect();
		assert_eq!(tiles.len(), 4);

		let (_, corner) = &tiles[3];
		assert_eq!(corner.dimensions(), (256, 256));
		assert_eq!(corner.get_pixel(0, 0), canvas.get_pixel(256, 256));
		assert_eq!(corner.get_pixel(43, 3), canvas.get_pixel(299, 259));
		assert_eq!(corner.get_pixel(44, 0), &Rgba([0, 0, 0, 0]));
		assert_eq!(corner.get_pixel(0, 4), &Rgba([0, 0, 0, 0]));
		assert_eq!(corner.get_pixel(255, 255), &Rgba([0, 0, 0, 0]));
	}

	#[test]
	fn empty_canvas_has_no_tiles() {
		assert_eq!(crop_tiles(&RgbaImage::new(0, 0), 256).count(), 0);
	}
}
