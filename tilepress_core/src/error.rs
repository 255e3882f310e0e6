//! Fatal error conditions of a pyramid build.
//!
//! Functions return `anyhow::Result` and attach context frames on the way up;
//! the root cause of a failed build is one of these variants and can be
//! recovered with `error.downcast_ref::<PyramidError>()`.

use std::{fmt, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PyramidError {
	/// Requested maximum zoom outside `10..=19`. Raised before any I/O.
	#[error("invalid zoom outside 10-19 range: {zoom}")]
	InvalidZoom { zoom: i64 },

	/// A level's raster would exceed the pixel budget of the build.
	#[error("canvas of zoom level {zoom} is {width}x{height} pixels, more than the budget of {limit}")]
	CanvasTooLarge {
		zoom: u8,
		width: u64,
		height: u64,
		limit: u64,
	},

	/// The build was cancelled because another task failed first.
	#[error("cancelled after an earlier failure")]
	Cancelled,

	/// The map renderer or the warp engine failed. Never retried.
	#[error("source unavailable during {stage}: {message}")]
	SourceUnavailable { stage: SourceStage, message: String },

	/// The bounding box or one level's grid has no extent on some axis.
	#[error("degenerate geometry{}: {detail}", at_zoom(.zoom))]
	GeometryDegenerate { zoom: Option<u8>, detail: String },

	/// The external compressor failed on one batch of tiles.
	#[error("compression failed for batch {batch} ({tiles} tiles, first {first:?}): {message}")]
	CompressionFailure {
		batch: usize,
		tiles: usize,
		first: Option<PathBuf>,
		message: String,
	},

	/// The container could not be written; no output file was left behind.
	#[error("failed to write container {path:?}: {message}")]
	ContainerWrite { path: PathBuf, message: String },
}

/// Which external collaborator a [`PyramidError::SourceUnavailable`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStage {
	Render,
	Warp { zoom: u8 },
}

impl fmt::Display for SourceStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SourceStage::Render => write!(f, "map rendering"),
			SourceStage::Warp { zoom } => write!(f, "warping zoom level {zoom}"),
		}
	}
}

#[allow(clippy::ref_option)]
fn at_zoom(zoom: &Option<u8>) -> String {
	zoom.map(|z| format!(" at zoom level {z}")).unwrap_or_default()
}

impl PyramidError {
	pub fn degenerate(zoom: Option<u8>, detail: impl Into<String>) -> Self {
		PyramidError::GeometryDegenerate {
			zoom,
			detail: detail.into(),
		}
	}

	pub fn source(stage: SourceStage, message: impl fmt::Display) -> Self {
		PyramidError::SourceUnavailable {
			stage,
			message: message.to_string(),
		}
	}
}
