//! JSON configuration for a processing pipeline.

use std::{fs, path::Path, time::Duration};

use flashblob_core::DiffThreshold;
use flashblob_extract::{
    BoundingBoxExtractor, BoundingBoxParams, ContourTracer, ContourTracerParams, ParamsError,
    Region,
};
use serde::{Deserialize, Serialize};

use crate::extractor::Extractor;

#[derive(thiserror::Error, Debug)]
pub enum ConfigIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("frame dimensions must be non-zero (got {width}x{height})")]
    EmptyFrame { width: usize, height: usize },

    #[error("poll_interval_ms must be positive")]
    PollInterval,

    #[error("max_aspect_ratio must be finite and at least 1 (got {0})")]
    AspectRatio(f64),

    #[error(transparent)]
    Params(#[from] ParamsError),
}

/// Which detector runs on every frame pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractorConfig {
    BoundingBox(BoundingBoxParams),
    ContourTrace(ContourTracerParams),
}

fn default_poll_interval_ms() -> u64 {
    100
}

/// Everything a [`ProcessingCoordinator`](crate::ProcessingCoordinator) needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Frame width in pixels; every frame must match.
    pub width: usize,
    /// Frame height in pixels; every frame must match.
    pub height: usize,
    pub threshold: DiffThreshold,
    pub extractor: ExtractorConfig,
    /// Worker sleep while waiting for a complete frame pair; 100 ms when
    /// omitted.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Deliver coordinates relative to the frame size instead of pixels.
    #[serde(default)]
    pub normalize_output: bool,
    /// Drop detections whose bounds have `height / width` outside
    /// `[1 / r, r]`.
    #[serde(default)]
    pub max_aspect_ratio: Option<f64>,
}

impl ProcessingConfig {
    /// Load and validate a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigIoError> {
        let cfg: Self = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyFrame {
                width: self.width,
                height: self.height,
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::PollInterval);
        }
        if let Some(r) = self.max_aspect_ratio {
            if !r.is_finite() || r < 1.0 {
                return Err(ConfigError::AspectRatio(r));
            }
        }
        match &self.extractor {
            ExtractorConfig::BoundingBox(p) => p.validate()?,
            ExtractorConfig::ContourTrace(p) => p.validate()?,
        }
        Ok(())
    }

    /// Build the configured detector.
    pub fn build_extractor(&self) -> Result<Extractor, ConfigError> {
        self.validate()?;
        Ok(match self.extractor {
            ExtractorConfig::BoundingBox(p) => Extractor::BoundingBox(BoundingBoxExtractor::new(p)),
            ExtractorConfig::ContourTrace(p) => Extractor::ContourTrace(ContourTracer::new(p)),
        })
    }

    /// The whole frame.
    pub fn region(&self) -> Region {
        Region::full(self.width, self.height)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
