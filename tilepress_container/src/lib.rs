//! The MBTiles container tilepress writes its pyramids into.
//!
//! [`MBTilesWriter`] assembles a container in one SQLite transaction next to
//! the output path and moves it into place only once everything is committed.
//! [`MBTilesReader`] opens finished containers for inspection.

mod mbtiles;
mod record;

pub use mbtiles::*;
pub use record::*;
