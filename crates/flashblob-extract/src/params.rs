use serde::{Deserialize, Serialize};

/// Rejected detector parameters.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParamsError {
    #[error("min_dim must be at least 1 (got {0})")]
    MinDim(i32),

    #[error("blob stride must be positive (got {width}x{height})")]
    BlobStride { width: i32, height: i32 },

    #[error("max_segment_length must be finite and at least 2 px (got {0})")]
    SegmentLength(f64),

    #[error("step_size must be finite and positive (got {0})")]
    StepSize(f64),

    #[error("max_vertices must be at least 4 (got {0})")]
    MaxVertices(usize),

    #[error("smoothing tolerance must be finite and non-negative (got {0})")]
    Smoothing(f64),
}

/// Parameters of the recursive bounding-box search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBoxParams {
    /// Regions fewer than `min_dim` pixels wide or tall are abandoned, so
    /// every emitted box is at least `min_dim` pixels on each side.
    pub min_dim: i32,
}

impl BoundingBoxParams {
    pub fn new(min_dim: i32) -> Result<Self, ParamsError> {
        let params = Self { min_dim };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.min_dim < 1 {
            return Err(ParamsError::MinDim(self.min_dim));
        }
        Ok(())
    }
}

/// Parameters of the contour tracer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContourTracerParams {
    /// Horizontal stride of the seed grid.
    pub min_blob_width: i32,
    /// Vertical stride of the seed grid.
    pub min_blob_height: i32,
    /// Edges longer than this are bisected during refinement.
    pub max_segment_length: f64,
    /// Walk step along the normal of oblique edges.
    pub step_size: f64,
    /// Refinement of a polygon stops once it holds this many vertices.
    pub max_vertices: usize,
    /// Collinearity tolerance in pixels; `None` disables smoothing.
    #[serde(default)]
    pub smoothing: Option<f64>,
}

impl ContourTracerParams {
    pub fn new(
        min_blob_width: i32,
        min_blob_height: i32,
        max_segment_length: f64,
        step_size: f64,
        max_vertices: usize,
    ) -> Result<Self, ParamsError> {
        let params = Self {
            min_blob_width,
            min_blob_height,
            max_segment_length,
            step_size,
            max_vertices,
            smoothing: None,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn with_smoothing(mut self, tolerance: f64) -> Result<Self, ParamsError> {
        self.smoothing = Some(tolerance);
        self.validate()?;
        Ok(self)
    }

    pub fn with_max_vertices(mut self, max_vertices: usize) -> Result<Self, ParamsError> {
        self.max_vertices = max_vertices;
        self.validate()?;
        Ok(self)
    }

    pub fn with_step_size(mut self, step_size: f64) -> Result<Self, ParamsError> {
        self.step_size = step_size;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.min_blob_width < 1 || self.min_blob_height < 1 {
            return Err(ParamsError::BlobStride {
                width: self.min_blob_width,
                height: self.min_blob_height,
            });
        }
        // Shorter bounds could round a bisection point back onto an endpoint.
        if !self.max_segment_length.is_finite() || self.max_segment_length < 2.0 {
            return Err(ParamsError::SegmentLength(self.max_segment_length));
        }
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(ParamsError::StepSize(self.step_size));
        }
        if self.max_vertices < 4 {
            return Err(ParamsError::MaxVertices(self.max_vertices));
        }
        if let Some(tol) = self.smoothing {
            if !tol.is_finite() || tol < 0.0 {
                return Err(ParamsError::Smoothing(tol));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_params_reject_zero() {
        assert_eq!(BoundingBoxParams::new(0), Err(ParamsError::MinDim(0)));
        assert!(BoundingBoxParams::new(40).is_ok());
    }

    #[test]
    fn tracer_params_validate_every_field() {
        assert!(matches!(
            ContourTracerParams::new(0, 10, 4.0, 1.0, 64),
            Err(ParamsError::BlobStride { .. })
        ));
        assert_eq!(
            ContourTracerParams::new(10, 10, 1.5, 1.0, 64),
            Err(ParamsError::SegmentLength(1.5))
        );
        assert!(matches!(
            ContourTracerParams::new(10, 10, 4.0, f64::NAN, 64),
            Err(ParamsError::StepSize(_))
        ));
        assert_eq!(
            ContourTracerParams::new(10, 10, 4.0, 1.0, 3),
            Err(ParamsError::MaxVertices(3))
        );
        let p = ContourTracerParams::new(10, 10, 4.0, 1.0, 64).expect("valid");
        assert_eq!(p.with_smoothing(-1.0), Err(ParamsError::Smoothing(-1.0)));
    }

    #[test]
    fn smoothing_defaults_to_off_in_json() {
        let json = r#"{"min_blob_width":20,"min_blob_height":10,"max_segment_length":10.0,"step_size":4.0,"max_vertices":256}"#;
        let p: ContourTracerParams = serde_json::from_str(json).expect("parse");
        assert_eq!(p.smoothing, None);
        assert!(p.validate().is_ok());
    }
}
