//! Turns a georeferenced map raster into a Web-Mercator tile pyramid packed
//! as MBTiles.
//!
//! The building blocks live in the member crates:
//!
//! - [`tilepress_core`] plans pyramids and addresses tiles,
//! - [`tilepress_image`] renders, warps, crops and compresses rasters,
//! - [`tilepress_container`] reads and writes MBTiles files.
//!
//! This crate wires them together in [`PyramidBuilder`] and reads build
//! settings from YAML via [`config::Config`].

mod builder;
pub mod config;

pub use builder::*;
