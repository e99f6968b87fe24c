//! Binary masks over pixel coordinates.
//!
//! A mask answers one question per pixel: did this pixel light up when the
//! flash was on? The extractors only ever talk to masks through
//! [`BinaryMask::test`], and they probe one pixel beyond the
//! region they are scanning, so every implementation must answer `false`
//! for out-of-range coordinates instead of panicking.

use std::cell::Cell;

use serde::{Deserialize, Serialize};

use crate::image::{Channel, RgbImageView};

/// Boundary-safe boolean predicate over pixel coordinates.
pub trait BinaryMask {
    /// Value at `(x, y)`. Out-of-range coordinates are `false`.
    fn test(&self, x: i32, y: i32) -> bool;

    /// Value at the pixel nearest to a real-valued coordinate.
    #[inline]
    fn test_f64(&self, x: f64, y: f64) -> bool {
        if !x.is_finite() || !y.is_finite() {
            return false;
        }
        let (x, y) = (x.round(), y.round());
        if x < i32::MIN as f64 || x > i32::MAX as f64 || y < i32::MIN as f64 || y > i32::MAX as f64 {
            return false;
        }
        self.test(x as i32, y as i32)
    }
}

impl<M: BinaryMask + ?Sized> BinaryMask for &M {
    #[inline]
    fn test(&self, x: i32, y: i32) -> bool {
        (**self).test(x, y)
    }
}

/// Upper bound on a second channel's difference.
///
/// Retroreflective tape under a green ring light brightens mostly in green;
/// white glare brightens every channel. Capping the red difference rejects
/// the glare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCeiling {
    pub channel: Channel,
    /// The difference on `channel` must stay strictly below this value.
    pub max_delta: i16,
}

/// Per-pixel difference rule between a flash-on and a flash-off frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffThreshold {
    /// Channel compared between the two frames (green by convention).
    pub channel: Channel,
    /// A pixel is set iff `on - off > tolerance` on `channel`.
    pub tolerance: i16,
    #[serde(default)]
    pub ceiling: Option<ChannelCeiling>,
}

impl DiffThreshold {
    pub fn new(channel: Channel, tolerance: i16) -> Self {
        Self {
            channel,
            tolerance,
            ceiling: None,
        }
    }

    pub fn with_ceiling(mut self, channel: Channel, max_delta: i16) -> Self {
        self.ceiling = Some(ChannelCeiling { channel, max_delta });
        self
    }

    /// Apply the rule to one pair of RGB pixels.
    #[inline]
    pub fn passes(&self, on: [u8; 3], off: [u8; 3]) -> bool {
        let i = self.channel.index();
        let delta = on[i] as i16 - off[i] as i16;
        if delta <= self.tolerance {
            return false;
        }
        match self.ceiling {
            Some(c) => {
                let k = c.channel.index();
                (on[k] as i16 - off[k] as i16) < c.max_delta
            }
            None => true,
        }
    }
}

const UNKNOWN: u8 = 0;
const CLEAR: u8 = 1;
const SET: u8 = 2;

/// Lazily evaluated flash-difference mask for one detection cycle.
///
/// Each pixel is computed at most once and cached; the cache lives exactly as
/// long as the mask, so build a fresh `DiffMask` for every frame pair.
pub struct DiffMask<'a> {
    on: RgbImageView<'a>,
    off: RgbImageView<'a>,
    threshold: DiffThreshold,
    memo: Vec<Cell<u8>>,
}

impl<'a> DiffMask<'a> {
    /// Panics when the two frames differ in size.
    pub fn new(on: RgbImageView<'a>, off: RgbImageView<'a>, threshold: DiffThreshold) -> Self {
        assert!(
            on.width == off.width && on.height == off.height,
            "flash-on frame is {}x{} but flash-off frame is {}x{}",
            on.width,
            on.height,
            off.width,
            off.height
        );
        let memo = vec![Cell::new(UNKNOWN); on.width * on.height];
        Self {
            on,
            off,
            threshold,
            memo,
        }
    }

    pub fn width(&self) -> usize {
        self.on.width
    }

    pub fn height(&self) -> usize {
        self.on.height
    }

    /// Number of pixels evaluated so far.
    pub fn evaluated(&self) -> usize {
        self.memo.iter().filter(|c| c.get() != UNKNOWN).count()
    }
}

impl BinaryMask for DiffMask<'_> {
    fn test(&self, x: i32, y: i32) -> bool {
        if !self.on.contains(x, y) {
            return false;
        }
        let idx = y as usize * self.on.width + x as usize;
        let cell = &self.memo[idx];
        match cell.get() {
            SET => true,
            CLEAR => false,
            _ => {
                let i = idx * 3;
                let on = [self.on.data[i], self.on.data[i + 1], self.on.data[i + 2]];
                let off = [self.off.data[i], self.off.data[i + 1], self.off.data[i + 2]];
                let v = self.threshold.passes(on, off);
                cell.set(if v { SET } else { CLEAR });
                v
            }
        }
    }
}

/// Owned, fully materialized mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitMask {
    width: usize,
    height: usize,
    bits: Vec<bool>,
}

impl BitMask {
    /// All-clear mask.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width * height],
        }
    }

    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut bits = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                bits.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            bits,
        }
    }

    /// Snapshot any mask over `width x height`.
    pub fn from_mask<M: BinaryMask + ?Sized>(mask: &M, width: usize, height: usize) -> Self {
        Self::from_fn(width, height, |x, y| mask.test(x as i32, y as i32))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        assert!(x < self.width && y < self.height, "bit out of range");
        self.bits[y * self.width + x] = value;
    }

    /// Set every pixel of the inclusive rectangle `[x0, x1] x [y0, y1]`,
    /// clipped to the mask.
    pub fn fill_rect(&mut self, x0: usize, y0: usize, x1: usize, y1: usize) {
        for y in y0..=y1.min(self.height.saturating_sub(1)) {
            for x in x0..=x1.min(self.width.saturating_sub(1)) {
                self.bits[y * self.width + x] = true;
            }
        }
    }

    pub fn count_set(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }
}

impl BinaryMask for BitMask {
    #[inline]
    fn test(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return false;
        }
        self.bits[y as usize * self.width + x as usize]
    }
}
