//! Blob extraction over flash-difference masks.
//!
//! Two strategies share the same inputs, a [`BinaryMask`] and an inclusive
//! [`Region`]:
//!
//! - [`BoundingBoxExtractor`] bisects the region along scan lines that no blob
//!   crosses and reports one axis-aligned box per separable blob.
//! - [`ContourTracer`] seeds on a coarse grid and refines a polygon around
//!   every blob it hits.
//!
//! Neither orders its output; see [`sort_rects_by_area_desc`] and
//! [`sort_contours_by_area_desc`].
//!
//! [`BinaryMask`]: flashblob_core::BinaryMask

mod bbox;
mod contour;
mod params;
pub mod probe;
mod region;

pub use bbox::{BoundingBoxExtractor, BoxSearchStats};
pub use contour::{sort_contours_by_area_desc, sort_rects_by_area_desc, ContourTracer};
pub use params::{BoundingBoxParams, ContourTracerParams, ParamsError};
pub use region::{Axis, Region};
