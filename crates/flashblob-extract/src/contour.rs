//! Contour tracing.
//!
//! A coarse staggered grid of seed points is tested against the mask. A set
//! seed grows a four-point diamond by running outward along both axes until
//! the mask clears; the diamond is then refined by bisecting every edge
//! longer than `max_segment_length` and pushing the new vertex out (or in)
//! along the edge normal until it sits on the blob border. Grid points inside
//! an already traced blob are skipped.
//!
//! Vertices are kept in clockwise screen order (y grows downward), so the
//! outward normal of edge `A -> B` is `(dy, -dx)`.

use flashblob_core::{BinaryMask, Contour, Polygon, Rect};
use nalgebra::{Point2, Vector2};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::params::ContourTracerParams;
use crate::region::Region;

#[derive(Clone, Debug)]
pub struct ContourTracer {
    params: ContourTracerParams,
}

impl ContourTracer {
    pub fn new(params: ContourTracerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ContourTracerParams {
        &self.params
    }

    /// Trace every blob hit by the seed grid inside `region`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, mask), fields(stride_x = self.params.min_blob_width, stride_y = self.params.min_blob_height))
    )]
    pub fn trace<M: BinaryMask + ?Sized>(&self, mask: &M, region: Region) -> Vec<Contour> {
        let (sw, sh) = (self.params.min_blob_width, self.params.min_blob_height);
        let mut contours = Vec::new();
        let mut covered: Vec<Rect> = Vec::new();
        let mut seeds = 0usize;

        let mut y = region.y_min + sh;
        while y < region.y_max - sh {
            let stagger = if y.rem_euclid(2 * sh) == 0 { sw / 2 } else { 0 };
            let mut x = region.x_min + sw + stagger;
            while x < region.x_max - sw {
                let (xf, yf) = (x as f64, y as f64);
                if let Some(b) = covered
                    .iter()
                    .find(|b| b.contains_point(Point2::new(xf, yf)))
                {
                    let far = b.max_x();
                    while (x as f64) < far {
                        x += sw;
                    }
                    continue;
                }
                if mask.test(x, y) {
                    seeds += 1;
                    let mut poly = self.seed(mask, region, x, y);
                    self.refine(mask, region, &mut poly);
                    if let Some(tol) = self.params.smoothing {
                        self.smooth(&mut poly, tol);
                    }
                    covered.push(poly.bounds());
                    if let Some(c) = poly.freeze() {
                        contours.push(c);
                    }
                }
                x += sw;
            }
            y += sh;
        }
        log::debug!(
            "contour trace: {} seeds, {} contours",
            seeds,
            contours.len()
        );
        contours
    }

    /// Four-point diamond around the set pixel `(x, y)`: left, top, right
    /// and bottom extent of the runs through it, clipped to `region`.
    pub fn seed<M: BinaryMask + ?Sized>(&self, mask: &M, region: Region, x: i32, y: i32) -> Polygon {
        let run = |dx: i32, dy: i32| {
            let (mut cx, mut cy) = (x, y);
            while region.contains(cx + dx, cy + dy) && mask.test(cx + dx, cy + dy) {
                cx += dx;
                cy += dy;
            }
            Point2::new(cx as f64, cy as f64)
        };
        let mut poly = Polygon::new_at(run(-1, 0));
        poly.push(run(0, -1));
        poly.push(run(1, 0));
        poly.push(run(0, 1));
        poly
    }

    /// Bisect edges until none is longer than `max_segment_length` or the
    /// polygon reaches `max_vertices`. Zero-length edges are collapsed.
    pub fn refine<M: BinaryMask + ?Sized>(&self, mask: &M, region: Region, poly: &mut Polygon) {
        let max_sq = self.params.max_segment_length * self.params.max_segment_length;
        let mut a = poly.head();
        loop {
            if poly.len() < 2 {
                return;
            }
            let b = poly.next(a);
            let (pa, pb) = (poly.point(a), poly.point(b));
            if pa == pb {
                poly.remove(b);
                continue;
            }
            if (pb - pa).norm_squared() > max_sq {
                if poly.len() >= self.params.max_vertices {
                    log::debug!(
                        "contour refinement stopped at {} vertices",
                        poly.len()
                    );
                    return;
                }
                let p = self.refine_edge(mask, region, pa, pb);
                poly.insert_after(a, p);
                continue;
            }
            if b == poly.head() {
                return;
            }
            a = b;
        }
    }

    /// Border point for the long edge `a -> b`.
    ///
    /// Walks from the edge midpoint along the normal: outward while the
    /// midpoint is set, inward while it is clear. The result is the last set
    /// sample of the walk, snapped to the pixel grid, and is never `a` or
    /// `b`. When the walk finds nothing usable the snapped midpoint is used.
    pub fn refine_edge<M: BinaryMask + ?Sized>(
        &self,
        mask: &M,
        region: Region,
        a: Point2<f64>,
        b: Point2<f64>,
    ) -> Point2<f64> {
        let d = b - a;
        let axis_aligned = d.x == 0.0 || d.y == 0.0;
        let mid = a + d * 0.5;
        let snapped_mid = snap(mid);
        let (start, step) = if axis_aligned {
            (snapped_mid, 1.0)
        } else {
            (mid, self.params.step_size)
        };
        let normal = Vector2::new(d.y, -d.x).normalize();
        let inside = mask.test_f64(start.x, start.y);
        let dir = (if inside { normal } else { -normal }) * step;

        let in_region = |p: Point2<f64>| region.contains(p.x.round() as i32, p.y.round() as i32);
        let mut last_set = inside.then_some(start);
        let mut k = 1.0;
        loop {
            let s = start + dir * k;
            if !in_region(s) {
                break;
            }
            let value = mask.test_f64(s.x, s.y);
            if value {
                last_set = Some(s);
            }
            if value != inside {
                break;
            }
            k += 1.0;
        }

        match last_set.map(snap) {
            Some(p) if p != a && p != b => p,
            _ => snapped_mid,
        }
    }

    /// Drop vertices within `tolerance` pixels of the chord joining their
    /// neighbours, keeping at least three.
    pub fn smooth(&self, poly: &mut Polygon, tolerance: f64) {
        let mut v = poly.head();
        for _ in 0..poly.len() {
            if poly.len() <= 3 {
                return;
            }
            let (prev, next) = (poly.prev(v), poly.next(v));
            let dist = chord_distance(poly.point(prev), poly.point(v), poly.point(next));
            if dist <= tolerance {
                poly.remove(v);
            }
            v = next;
        }
    }
}

fn snap(p: Point2<f64>) -> Point2<f64> {
    Point2::new(p.x.round(), p.y.round())
}

/// Distance from `p` to the segment line `a -> c` (to `a` when `a == c`).
fn chord_distance(a: Point2<f64>, p: Point2<f64>, c: Point2<f64>) -> f64 {
    let chord = c - a;
    let len = chord.norm();
    if len == 0.0 {
        return (p - a).norm();
    }
    let ap = p - a;
    (chord.x * ap.y - chord.y * ap.x).abs() / len
}

/// Sort rectangles largest first.
pub fn sort_rects_by_area_desc(rects: &mut [Rect]) {
    rects.sort_by(|a, b| b.area().total_cmp(&a.area()));
}

/// Sort contours largest first.
pub fn sort_contours_by_area_desc(contours: &mut [Contour]) {
    contours.sort_by(|a, b| b.area().total_cmp(&a.area()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashblob_core::BitMask;

    fn tracer(max_segment_length: f64) -> ContourTracer {
        let params = ContourTracerParams::new(6, 6, max_segment_length, 1.0, 512).expect("params");
        ContourTracer::new(params)
    }

    fn disc(size: usize, cx: f64, cy: f64, r: f64) -> BitMask {
        BitMask::from_fn(size, size, |x, y| {
            let (dx, dy) = (x as f64 - cx, y as f64 - cy);
            dx * dx + dy * dy <= r * r
        })
    }

    #[test]
    fn seed_spans_axis_runs() {
        let mut mask = BitMask::new(30, 30);
        mask.fill_rect(8, 10, 20, 18);
        let poly = tracer(4.0).seed(&mask, Region::full(30, 30), 12, 14);
        let pts: Vec<_> = poly.iter().map(|(_, p)| p).collect();
        assert_eq!(
            pts,
            vec![
                Point2::new(8.0, 14.0),
                Point2::new(12.0, 10.0),
                Point2::new(20.0, 14.0),
                Point2::new(12.0, 18.0)
            ]
        );
    }

    #[test]
    fn seed_is_clipped_to_region() {
        let mask = BitMask::from_fn(20, 20, |_, _| true);
        let poly = tracer(4.0).seed(&mask, Region::new(5, 5, 15, 15), 10, 10);
        assert_eq!(poly.bounds(), Rect::new(5.0, 5.0, 11.0, 11.0));
    }

    #[test]
    fn refine_leaves_no_long_edges() {
        let mask = disc(60, 30.0, 30.0, 15.0);
        let t = tracer(4.0);
        let region = Region::full(60, 60);
        let mut poly = t.seed(&mask, region, 30, 30);
        t.refine(&mask, region, &mut poly);
        for (id, p) in poly.iter() {
            let q = poly.point(poly.next(id));
            assert!((q - p).norm() <= 4.0, "edge {p} -> {q} too long");
        }
        assert!(poly.len() >= 8);
    }

    #[test]
    fn refined_disc_area_is_close_to_true_area() {
        let mask = disc(60, 30.0, 30.0, 15.0);
        let contours = tracer(3.0).trace(&mask, Region::full(60, 60));
        assert_eq!(contours.len(), 1);
        let area = contours[0].area();
        let expected = std::f64::consts::PI * 15.0 * 15.0;
        assert!(
            (area - expected).abs() < 0.2 * expected,
            "area {area} vs {expected}"
        );
        let b = contours[0].bounds();
        assert!((b.x() - 15.0).abs() <= 1.0 && (b.max_x() - 46.0).abs() <= 1.0);
    }

    #[test]
    fn every_long_edge_gains_a_vertex() {
        let mut mask = BitMask::new(40, 40);
        mask.fill_rect(10, 10, 29, 29);
        let t = tracer(4.0);
        let region = Region::full(40, 40);
        let a = Point2::new(10.0, 20.0);
        let b = Point2::new(20.0, 10.0);
        let p = t.refine_edge(&mask, region, a, b);
        assert_ne!(p, a);
        assert_ne!(p, b);
        // The midpoint (15, 15) is set, so the walk goes out toward the corner.
        assert!(p.x < 15.0 && p.y < 15.0);
        assert!(mask.test_f64(p.x, p.y));
    }

    #[test]
    fn duplicate_vertices_collapse() {
        let mut mask = BitMask::new(10, 10);
        mask.set(5, 5, true);
        let t = tracer(4.0);
        let region = Region::full(10, 10);
        let mut poly = t.seed(&mask, region, 5, 5);
        t.refine(&mask, region, &mut poly);
        assert_eq!(poly.len(), 1);
        assert!(poly.freeze().is_none());
    }

    #[test]
    fn vertex_cap_bounds_refinement() {
        let mask = disc(80, 40.0, 40.0, 30.0);
        let params = ContourTracerParams::new(6, 6, 2.0, 1.0, 12).expect("params");
        let t = ContourTracer::new(params);
        let region = Region::full(80, 80);
        let mut poly = t.seed(&mask, region, 40, 40);
        t.refine(&mask, region, &mut poly);
        assert_eq!(poly.len(), 12);
    }

    #[test]
    fn smoothing_removes_collinear_runs() {
        let mut poly = Polygon::new_at(Point2::new(0.0, 0.0));
        for p in [(5.0, 0.0), (10.0, 0.0), (10.0, 10.0), (5.0, 10.2), (0.0, 10.0)] {
            poly.push(Point2::new(p.0, p.1));
        }
        tracer(4.0).smooth(&mut poly, 0.5);
        assert_eq!(poly.len(), 4);
        let mut tri = Polygon::new_at(Point2::new(0.0, 0.0));
        tri.push(Point2::new(1.0, 0.0));
        tri.push(Point2::new(2.0, 0.0));
        tracer(4.0).smooth(&mut tri, 1.0);
        assert_eq!(tri.len(), 3);
    }

    #[test]
    fn grid_skips_points_inside_found_blobs() {
        let mut mask = BitMask::new(100, 60);
        mask.fill_rect(10, 10, 60, 40);
        mask.fill_rect(75, 15, 90, 45);
        let mut contours = tracer(4.0).trace(&mask, Region::full(100, 60));
        sort_contours_by_area_desc(&mut contours);
        assert_eq!(contours.len(), 2);
        assert!(contours[0].area() > contours[1].area());
        assert!(contours[0].bounds().contains_x(30.0));
        assert!(contours[1].bounds().contains_x(80.0));
    }

    #[test]
    fn sort_puts_largest_first() {
        let mut rects = vec![
            Rect::new(0.0, 0.0, 2.0, 2.0),
            Rect::new(0.0, 0.0, 5.0, 5.0),
            Rect::new(0.0, 0.0, 3.0, 3.0),
        ];
        sort_rects_by_area_desc(&mut rects);
        let areas: Vec<f64> = rects.iter().map(Rect::area).collect();
        assert_eq!(areas, vec![25.0, 9.0, 4.0]);
    }
}
