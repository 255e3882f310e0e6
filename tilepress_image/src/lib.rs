//! Raster stages of a tilepress build.
//!
//! The pixel work is split along the seams of the outside tools it may hand
//! off to:
//!
//! - [`MapRenderer`] produces the single georeferenced source raster,
//! - [`WarpEngine`] resamples it onto each level's canvas,
//! - [`TileCompressor`] shrinks the cropped tile files in place.
//!
//! [`LevelRasterizer`] drives one level from world file to cropped tiles and
//! [`TileOptimizer`] runs the compressor over bounded batches. Both stop early
//! once a shared [`Cancellation`] is set.

mod cancel;
mod command;
mod compress;
mod crop;
mod level;
mod optimize;
pub mod png;
mod source;
mod warp;
mod world_file;

pub use cancel::*;
pub use compress::*;
pub use crop::*;
pub use level::*;
pub use optimize::*;
pub use source::*;
pub use warp::*;
pub use world_file::*;
