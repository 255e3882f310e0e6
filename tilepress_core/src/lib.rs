//! Geometry, planning and addressing for tilepress tile pyramids.
//!
//! Everything in this crate is pure: no files are touched and no external
//! programs are spawned. The crate answers three questions:
//!
//! - which zoom levels a map needs and what each level's tile grid looks like
//!   ([`Pyramid::plan`], [`LevelPlan`]),
//! - where a cropped tile lands in the container ([`TileIndexer`], [`TileAddress`]),
//! - how wide the worker pools may be ([`ConcurrencyLimits`]).
//!
//! ```
//! use tilepress_core::*;
//!
//! let bbox = BoundingBox::new(Projection::web_mercator(), 16_800_000.0, -4_050_000.0, 16_830_000.0, -4_020_000.0).unwrap();
//! let pyramid = Pyramid::plan(&TilingScheme::WEB_MERCATOR, &bbox, 12).unwrap();
//! assert_eq!(pyramid.zoom_max().get(), 12);
//! assert!(pyramid.zoom_min() <= pyramid.zoom_max());
//! ```

mod bbox;
mod concurrency;
mod constants;
mod error;
mod grid;
mod indexer;
mod projection;
mod pyramid;
mod zoom;

pub use bbox::*;
pub use concurrency::*;
pub use constants::*;
pub use error::*;
pub use grid::*;
pub use indexer::*;
pub use projection::*;
pub use pyramid::*;
pub use zoom::*;
