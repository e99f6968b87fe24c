use serde::{Deserialize, Serialize};

/// Scan-line orientation. A `Vertical` line is a column (`u = x`, running
/// along `v = y`); a `Horizontal` line is a row (`u = y`, running along
/// `v = x`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    Vertical,
    Horizontal,
}

impl Axis {
    /// The axis the lines of `self` run along.
    #[inline]
    pub fn cross(self) -> Self {
        match self {
            Axis::Vertical => Axis::Horizontal,
            Axis::Horizontal => Axis::Vertical,
        }
    }
}

/// Inclusive search region `[x_min, x_max] x [y_min, y_max]` in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl Region {
    pub fn new(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Every pixel of a `width x height` frame.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width as i32 - 1, height as i32 - 1)
    }

    /// `x_max - x_min`; negative for an empty region.
    #[inline]
    pub fn width_span(&self) -> i32 {
        self.x_max - self.x_min
    }

    /// `y_max - y_min`; negative for an empty region.
    #[inline]
    pub fn height_span(&self) -> i32 {
        self.y_max - self.y_min
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    /// `(min, max)` of the line positions perpendicular to `axis`.
    #[inline]
    pub(crate) fn span(&self, axis: Axis) -> (i32, i32) {
        match axis {
            Axis::Vertical => (self.x_min, self.x_max),
            Axis::Horizontal => (self.y_min, self.y_max),
        }
    }

    /// Copy with the `axis` span replaced by `[min, max]`.
    pub(crate) fn with_span(&self, axis: Axis, min: i32, max: i32) -> Self {
        match axis {
            Axis::Vertical => Self {
                x_min: min,
                x_max: max,
                ..*self
            },
            Axis::Horizontal => Self {
                y_min: min,
                y_max: max,
                ..*self
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_region_is_inclusive() {
        let r = Region::full(20, 10);
        assert_eq!((r.width_span(), r.height_span()), (19, 9));
        assert!(r.contains(19, 9));
        assert!(!r.contains(20, 9));
    }

    #[test]
    fn with_span_only_touches_one_axis() {
        let r = Region::new(0, 0, 9, 9).with_span(Axis::Horizontal, 3, 5);
        assert_eq!(r, Region::new(0, 3, 9, 5));
        assert_eq!(r.span(Axis::Vertical), (0, 9));
    }
}
