//! Local adjacency tests along scan lines.
//!
//! The bounding-box search never flood-fills. It asks whether a scan line
//! separates blob pixels: a set pixel on line `u` "connects" to a neighbour
//! line when the neighbour holds a short run of set pixels right next to it.
//! A line is free when no set pixel connects to both neighbours at once.
//!
//! All probes are written against an [`Axis`], so columns and rows share the
//! same code. `u` is the line position and `v` the position along the line.

use flashblob_core::BinaryMask;

use crate::region::Axis;

/// How one set pixel on a line connects to its two neighbour lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Adjacency {
    /// Connected to the line before and the line after.
    Both,
    /// Connected only to the line before (`u - 1`).
    Before,
    /// Connected only to the line after (`u + 1`).
    After,
    Neither,
}

impl Adjacency {
    fn from_sides(before: bool, after: bool) -> Self {
        match (before, after) {
            (true, true) => Adjacency::Both,
            (true, false) => Adjacency::Before,
            (false, true) => Adjacency::After,
            (false, false) => Adjacency::Neither,
        }
    }
}

/// Summary of a whole scan line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineProbe {
    /// Some pixel bridges the line; it cannot split the region.
    Blocked,
    /// The line splits the region. `before_edge` means blob pixels end on
    /// this line coming from `u - 1` (a far edge of the lower half);
    /// `after_edge` means blob pixels start on this line (a near edge of the
    /// upper half).
    Free { before_edge: bool, after_edge: bool },
}

#[inline]
fn at<M: BinaryMask + ?Sized>(mask: &M, axis: Axis, u: i32, v: i32) -> bool {
    match axis {
        Axis::Vertical => mask.test(u, v),
        Axis::Horizontal => mask.test(v, u),
    }
}

/// Three-pixel run test: `(u, v)` is set together with one of its two
/// neighbours along the line.
#[inline]
fn run_at<M: BinaryMask + ?Sized>(mask: &M, axis: Axis, u: i32, v: i32) -> bool {
    at(mask, axis, u, v) && (at(mask, axis, u, v - 1) || at(mask, axis, u, v + 1))
}

/// Adjacency of pixel `(u, v)` on a line spanning `[v_min, v_max]`.
///
/// End pixels only look inward along the line, so a blob touching the region
/// border is judged by the two pixels diagonal to it.
pub fn probe_pixel<M: BinaryMask + ?Sized>(
    mask: &M,
    axis: Axis,
    u: i32,
    v: i32,
    v_min: i32,
    v_max: i32,
) -> Adjacency {
    if !at(mask, axis, u, v) {
        return Adjacency::Neither;
    }
    let side = |n: i32| {
        if v == v_min {
            at(mask, axis, n, v) && at(mask, axis, n, v + 1)
        } else if v == v_max {
            at(mask, axis, n, v) && at(mask, axis, n, v - 1)
        } else {
            run_at(mask, axis, n, v)
        }
    };
    Adjacency::from_sides(side(u - 1), side(u + 1))
}

/// Classify line `u` over `[v_min, v_max]`.
pub fn probe_line<M: BinaryMask + ?Sized>(
    mask: &M,
    axis: Axis,
    u: i32,
    v_min: i32,
    v_max: i32,
) -> LineProbe {
    let mut before_edge = false;
    let mut after_edge = false;
    for v in v_min..=v_max {
        match probe_pixel(mask, axis, u, v, v_min, v_max) {
            Adjacency::Both => return LineProbe::Blocked,
            Adjacency::Before => before_edge = true,
            Adjacency::After => after_edge = true,
            Adjacency::Neither => {}
        }
    }
    LineProbe::Free {
        before_edge,
        after_edge,
    }
}

/// Does the region border line `u` hold blob pixels connected to the line
/// one step toward the interior (`inward` is `+1` on the min side, `-1` on
/// the max side)?
pub fn probe_boundary<M: BinaryMask + ?Sized>(
    mask: &M,
    axis: Axis,
    u: i32,
    v_min: i32,
    v_max: i32,
    inward: i32,
) -> bool {
    let n = u + inward;
    if at(mask, axis, u, v_min) && at(mask, axis, n, v_min) && at(mask, axis, n, v_min + 1) {
        return true;
    }
    if at(mask, axis, u, v_max) && at(mask, axis, n, v_max) && at(mask, axis, n, v_max - 1) {
        return true;
    }
    (v_min + 1..v_max).any(|v| at(mask, axis, u, v) && run_at(mask, axis, n, v))
}
