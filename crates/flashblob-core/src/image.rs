use serde::{Deserialize, Serialize};

/// Errors produced when wrapping raw RGB buffers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("invalid RGB buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },

    #[error("invalid RGB image dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
}

/// One colour channel of an interleaved RGB pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// Byte offset of the channel inside an RGB triple.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }
}

/// Borrowed, row-major, interleaved 8-bit RGB image.
#[derive(Clone, Copy, Debug)]
pub struct RgbImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h*3
}

impl<'a> RgbImageView<'a> {
    /// Wrap a buffer whose length is already known to match `width * height * 3`.
    ///
    /// Panics when the length does not match; use [`RgbImageView::from_slice`]
    /// for untrusted input.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Self {
        assert_eq!(
            data.len(),
            width * height * 3,
            "RGB buffer does not match {width}x{height}"
        );
        Self {
            width,
            height,
            data,
        }
    }

    /// Checked constructor for raw buffers.
    pub fn from_slice(width: usize, height: usize, data: &'a [u8]) -> Result<Self, ViewError> {
        let Some(expected) = width.checked_mul(height).and_then(|v| v.checked_mul(3)) else {
            return Err(ViewError::InvalidDimensions { width, height });
        };
        if data.len() != expected {
            return Err(ViewError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// RGB triple at `(x, y)`, or `None` outside the image.
    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 3]> {
        if !self.contains(x, y) {
            return None;
        }
        let i = (y as usize * self.width + x as usize) * 3;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    /// Single channel value at `(x, y)`, or `None` outside the image.
    #[inline]
    pub fn channel(&self, x: i32, y: i32, channel: Channel) -> Option<u8> {
        if !self.contains(x, y) {
            return None;
        }
        Some(self.data[(y as usize * self.width + x as usize) * 3 + channel.index()])
    }
}

/// Owned RGB image, mostly used for synthetic frames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RgbImage {
    /// Black image of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 3],
        }
    }

    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> [u8; 3],
    ) -> Self {
        let mut data = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn view(&self) -> RgbImageView<'_> {
        RgbImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    pub fn put_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        assert!(x < self.width && y < self.height, "pixel out of range");
        let i = (y * self.width + x) * 3;
        self.data[i..i + 3].copy_from_slice(&rgb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_slice_rejects_wrong_length() {
        let buf = [0u8; 11];
        let err = RgbImageView::from_slice(2, 2, &buf).unwrap_err();
        assert_eq!(
            err,
            ViewError::InvalidBuffer {
                expected: 12,
                got: 11
            }
        );
    }

    #[test]
    fn out_of_range_reads_are_none() {
        let img = RgbImage::from_fn(3, 2, |x, y| [x as u8, y as u8, 7]);
        let view = img.view();
        assert_eq!(view.pixel(2, 1), Some([2, 1, 7]));
        assert_eq!(view.channel(1, 0, Channel::Green), Some(0));
        assert_eq!(view.pixel(-1, 0), None);
        assert_eq!(view.pixel(3, 0), None);
        assert_eq!(view.channel(0, 2, Channel::Red), None);
    }
}
