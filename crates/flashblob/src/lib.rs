//! High-level facade for the `flashblob-*` workspace.
//!
//! This crate provides:
//! - re-exports of the core types and the two blob extractors
//! - a JSON-configured [`ProcessingCoordinator`] that pairs flash-on and
//!   flash-off frames from a capture thread and runs detection on a worker
//! - (feature `image`) one-shot helpers over `image::RgbImage` pairs
//!
//! ## Quickstart
//!
//! ```no_run
//! use flashblob::{Detections, Flash, ProcessingConfig, ProcessingCoordinator};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = ProcessingConfig::load_json("processing.json")?;
//! let coordinator = ProcessingCoordinator::<image::RgbImage>::spawn(&cfg, |found: Detections| {
//!     println!("{} targets", found.len());
//! })?;
//!
//! let on = image::open("on.png")?.to_rgb8();
//! let off = image::open("off.png")?.to_rgb8();
//! coordinator.update(on, Flash::On);
//! coordinator.update(off, Flash::Off);
//!
//! coordinator.stop()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `flashblob::core`: frame views, masks, rectangles and polygons.
//! - `flashblob::extract`: bounding-box bisection and contour tracing.
//! - `flashblob::detect` (feature `image`): one-shot helpers from `image::RgbImage`.

pub use flashblob_core as core;
pub use flashblob_extract as extract;

mod config;
mod coordinator;
mod extractor;

#[cfg(feature = "image")]
pub mod detect;

pub use config::{ConfigError, ConfigIoError, ExtractorConfig, ProcessingConfig};
pub use coordinator::{
    CoordinatorError, CoordinatorStats, DetectionSink, Flash, Frame, ProcessingCoordinator,
    UpdateOutcome,
};
pub use extractor::{Detections, Extractor};

pub use flashblob_core::{
    init_with_level, BinaryMask, Channel, Contour, DiffMask, DiffThreshold, Rect, RgbImageView,
};
pub use flashblob_extract::{BoundingBoxParams, ContourTracerParams, Region};

/// Install a `tracing` subscriber and route `log` records into it.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let _ = tracing_log::LogTracer::init();
    flashblob_core::init_tracing(json);
}
