//! Core types for flash-differenced target detection.
//!
//! A camera grabs one frame with the ring light on and one with it off;
//! retroreflective tape lights up only in the first. This crate holds the
//! pieces every detector shares: borrowed RGB views, the [`BinaryMask`]
//! predicate built from a frame pair, pixel rectangles and contour polygons.
//! It knows nothing about how blobs are found.

mod image;
mod logger;
mod mask;
mod polygon;
mod rect;

pub use image::{Channel, RgbImage, RgbImageView, ViewError};
pub use mask::{BinaryMask, BitMask, ChannelCeiling, DiffMask, DiffThreshold};
pub use polygon::{Contour, Polygon, VertexId};
pub use rect::Rect;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
