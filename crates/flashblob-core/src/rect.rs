use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle, top-left anchored.
///
/// Extractors emit rectangles in pixel units covering whole pixel cells: the
/// blob occupying pixels `5..=14` on both axes is `Rect { x: 5, y: 5, width: 10,
/// height: 10 }`. After [`Rect::normalized`] the same type carries `[0, 1]`
/// image-relative coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl Rect {
    /// Panics unless both extents are strictly positive and finite.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        assert!(
            width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite(),
            "rectangle extents must be positive, got {width}x{height}"
        );
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering the inclusive pixel range `[x_min, x_max] x [y_min, y_max]`.
    pub fn from_inclusive(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self::new(
            x_min as f64,
            y_min as f64,
            (x_max - x_min + 1) as f64,
            (y_max - y_min + 1) as f64,
        )
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.y
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Right edge, exclusive.
    #[inline]
    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge, exclusive.
    #[inline]
    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// `height / width`.
    #[inline]
    pub fn aspect_ratio(&self) -> f64 {
        self.height / self.width
    }

    #[inline]
    pub fn contains_x(&self, x: f64) -> bool {
        x >= self.x && x < self.max_x()
    }

    #[inline]
    pub fn contains_y(&self, y: f64) -> bool {
        y >= self.y && y < self.max_y()
    }

    pub fn contains_point(&self, p: Point2<f64>) -> bool {
        self.contains_x(p.x) && self.contains_y(p.y)
    }

    /// Multiply the x axis by `xf` and the y axis by `yf`.
    pub fn scale(&self, xf: f64, yf: f64) -> Self {
        Self::new(self.x * xf, self.y * yf, self.width * xf, self.height * yf)
    }

    /// Map pixel coordinates of an `image_width x image_height` frame to `[0, 1]`.
    pub fn normalized(&self, image_width: usize, image_height: usize) -> Self {
        self.scale(1.0 / image_width as f64, 1.0 / image_height as f64)
    }
}
