//! Recursive bounding-box search.
//!
//! The search bisects a region with scan lines that no blob crosses. Each
//! call first looks for a free column outward from the horizontal middle,
//! then for a free row outward from the vertical middle. A free line splits
//! the region in two and both halves are searched. When neither axis splits,
//! the region holds (at most) one blob and its four edges, tracked as bound
//! hints on the way down, become a rectangle.
//!
//! A region narrower than `min_dim` pixels on either axis is abandoned, so
//! every emitted box is at least `min_dim` pixels a side.
//!
//! A free line that is also a blob edge is kept in the half that owns the
//! edge and passed down as that half's bound hint; otherwise the halves
//! shrink past it.

use flashblob_core::{BinaryMask, Rect};
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::params::BoundingBoxParams;
use crate::probe::{probe_boundary, probe_line, LineProbe};
use crate::region::{Axis, Region};

/// Instrumentation of one search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BoxSearchStats {
    /// Recursive invocations, including the root.
    pub calls: usize,
    /// Deepest recursion level reached (root is 1).
    pub max_depth: usize,
}

/// Known blob edges along one axis, as inclusive line positions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Hints {
    min: Option<i32>,
    max: Option<i32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Cut {
    at: i32,
    before_edge: bool,
    after_edge: bool,
}

/// Finds axis-aligned boxes around blobs of at least `min_dim` pixels a side.
#[derive(Clone, Debug)]
pub struct BoundingBoxExtractor {
    params: BoundingBoxParams,
}

impl BoundingBoxExtractor {
    pub fn new(params: BoundingBoxParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BoundingBoxParams {
        &self.params
    }

    /// Boxes of every separable blob inside `region`, in discovery order.
    pub fn extract<M: BinaryMask + ?Sized>(&self, mask: &M, region: Region) -> Vec<Rect> {
        self.extract_with_stats(mask, region).0
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, mask), fields(min_dim = self.params.min_dim))
    )]
    pub fn extract_with_stats<M: BinaryMask + ?Sized>(
        &self,
        mask: &M,
        region: Region,
    ) -> (Vec<Rect>, BoxSearchStats) {
        let mut search = Search {
            mask,
            min_dim: self.params.min_dim,
            boxes: Vec::new(),
            stats: BoxSearchStats::default(),
        };
        search.run(region, Hints::default(), Hints::default(), 1);
        log::debug!(
            "bounding-box search found {} boxes in {} calls (depth {})",
            search.boxes.len(),
            search.stats.calls,
            search.stats.max_depth
        );
        (search.boxes, search.stats)
    }
}

struct Search<'m, M: ?Sized> {
    mask: &'m M,
    min_dim: i32,
    boxes: Vec<Rect>,
    stats: BoxSearchStats,
}

impl<M: BinaryMask + ?Sized> Search<'_, M> {
    /// Returns whether any box was emitted below this call.
    fn run(&mut self, region: Region, mut xh: Hints, mut yh: Hints, depth: usize) -> bool {
        self.stats.calls += 1;
        self.stats.max_depth = self.stats.max_depth.max(depth);

        if region.width_span() + 1 < self.min_dim || region.height_span() + 1 < self.min_dim {
            return false;
        }

        if let Some(cut) = self.find_cut(region, Axis::Vertical, &mut xh) {
            return self.split(region, Axis::Vertical, cut, xh, depth);
        }
        if let Some(cut) = self.find_cut(region, Axis::Horizontal, &mut yh) {
            return self.split(region, Axis::Horizontal, cut, yh, depth);
        }

        match (xh.min, xh.max, yh.min, yh.max) {
            (Some(x0), Some(x1), Some(y0), Some(y1)) if x0 < x1 && y0 < y1 => {
                self.boxes.push(Rect::from_inclusive(x0, y0, x1, y1));
                true
            }
            _ => false,
        }
    }

    /// Look for a free line perpendicular to `axis`, first from the middle
    /// toward the min side, then toward the max side. Border lines are never
    /// cuts; they are probed to resolve the bound hints instead.
    fn find_cut(&self, region: Region, axis: Axis, hints: &mut Hints) -> Option<Cut> {
        let (min, max) = region.span(axis);
        let (v_min, v_max) = region.span(axis.cross());
        let mid = min + (max - min) / 2;

        for u in (min + 1..=mid).rev() {
            if let Some(cut) = self.free_line(axis, u, v_min, v_max) {
                return Some(cut);
            }
        }
        if hints.min != Some(min) && probe_boundary(self.mask, axis, min, v_min, v_max, 1) {
            hints.min = Some(min);
        }

        for u in mid + 1..max {
            if let Some(cut) = self.free_line(axis, u, v_min, v_max) {
                return Some(cut);
            }
        }
        if hints.max != Some(max) && probe_boundary(self.mask, axis, max, v_min, v_max, -1) {
            hints.max = Some(max);
        }
        None
    }

    fn free_line(&self, axis: Axis, u: i32, v_min: i32, v_max: i32) -> Option<Cut> {
        match probe_line(self.mask, axis, u, v_min, v_max) {
            LineProbe::Blocked => None,
            LineProbe::Free {
                before_edge,
                after_edge,
            } => Some(Cut {
                at: u,
                before_edge,
                after_edge,
            }),
        }
    }

    fn split(&mut self, region: Region, axis: Axis, cut: Cut, hints: Hints, depth: usize) -> bool {
        let (min, max) = region.span(axis);
        let lower = region.with_span(axis, min, cut.at - i32::from(!cut.before_edge));
        let upper = region.with_span(axis, cut.at + i32::from(!cut.after_edge), max);
        let lower_hints = Hints {
            min: hints.min,
            max: cut.before_edge.then_some(cut.at),
        };
        let upper_hints = Hints {
            min: cut.after_edge.then_some(cut.at),
            max: hints.max,
        };
        // Hints across the cut no longer describe either half.
        let (lower_found, upper_found) = match axis {
            Axis::Vertical => (
                self.run(lower, lower_hints, Hints::default(), depth + 1),
                self.run(upper, upper_hints, Hints::default(), depth + 1),
            ),
            Axis::Horizontal => (
                self.run(lower, Hints::default(), lower_hints, depth + 1),
                self.run(upper, Hints::default(), upper_hints, depth + 1),
            ),
        };
        lower_found | upper_found
    }
}
