//! Mutable contour polygons and their frozen form.
//!
//! [`Polygon`] is a circular vertex ring stored in an index arena: each slot
//! knows its `next` and `prev` neighbour, so inserting or removing a vertex
//! anywhere is O(1) and no vertex ever owns another. Area and bounds are
//! computed on first use and dropped on every mutation.
//!
//! Once tracing is done the ring is [`Polygon::freeze`]d into a [`Contour`],
//! a plain vertex list with the derived values baked in.

use std::cell::OnceCell;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::rect::Rect;

/// Handle to one vertex of a [`Polygon`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexId(usize);

#[derive(Clone, Debug)]
struct Node {
    point: Point2<f64>,
    next: usize,
    prev: usize,
    alive: bool,
}

#[derive(Clone, Debug)]
pub struct Polygon {
    nodes: Vec<Node>,
    free: Vec<usize>,
    head: usize,
    len: usize,
    area: OnceCell<f64>,
    bounds: OnceCell<Rect>,
}

impl Polygon {
    /// Ring holding the single vertex `p`.
    pub fn new_at(p: Point2<f64>) -> Self {
        Self {
            nodes: vec![Node {
                point: p,
                next: 0,
                prev: 0,
                alive: true,
            }],
            free: Vec::new(),
            head: 0,
            len: 1,
            area: OnceCell::new(),
            bounds: OnceCell::new(),
        }
    }

    fn invalidate(&mut self) {
        self.area.take();
        self.bounds.take();
    }

    fn node(&self, id: VertexId) -> &Node {
        let node = &self.nodes[id.0];
        assert!(node.alive, "vertex {} was removed", id.0);
        node
    }

    fn alloc(&mut self, point: Point2<f64>) -> usize {
        let node = Node {
            point,
            next: 0,
            prev: 0,
            alive: true,
        };
        match self.free.pop() {
            Some(i) => {
                self.nodes[i] = node;
                i
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    /// Insert `p` right after `after` and return its handle.
    pub fn insert_after(&mut self, after: VertexId, p: Point2<f64>) -> VertexId {
        let next = self.node(after).next;
        let i = self.alloc(p);
        self.nodes[i].prev = after.0;
        self.nodes[i].next = next;
        self.nodes[after.0].next = i;
        self.nodes[next].prev = i;
        self.len += 1;
        self.invalidate();
        VertexId(i)
    }

    /// Append `p` as the last vertex (just before the head).
    pub fn push(&mut self, p: Point2<f64>) -> VertexId {
        let last = self.nodes[self.head].prev;
        self.insert_after(VertexId(last), p)
    }

    /// Unlink a vertex and return its point. The last remaining vertex is
    /// never removed; `None` is returned instead.
    pub fn remove(&mut self, id: VertexId) -> Option<Point2<f64>> {
        if self.len == 1 {
            return None;
        }
        let Node {
            point, next, prev, ..
        } = *self.node(id);
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
        self.nodes[id.0].alive = false;
        self.free.push(id.0);
        if self.head == id.0 {
            self.head = next;
        }
        self.len -= 1;
        self.invalidate();
        Some(point)
    }

    #[inline]
    pub fn head(&self) -> VertexId {
        VertexId(self.head)
    }

    #[inline]
    pub fn next(&self, id: VertexId) -> VertexId {
        VertexId(self.node(id).next)
    }

    #[inline]
    pub fn prev(&self, id: VertexId) -> VertexId {
        VertexId(self.node(id).prev)
    }

    #[inline]
    pub fn point(&self, id: VertexId) -> Point2<f64> {
        self.node(id).point
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`: a ring holds at least one vertex.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Vertices in ring order starting at the head.
    pub fn iter(&self) -> impl Iterator<Item = (VertexId, Point2<f64>)> + '_ {
        let mut cur = self.head;
        (0..self.len).map(move |_| {
            let id = cur;
            cur = self.nodes[cur].next;
            (VertexId(id), self.nodes[id].point)
        })
    }

    /// Unsigned shoelace area of the ring.
    pub fn area(&self) -> f64 {
        *self.area.get_or_init(|| shoelace(self.iter().map(|(_, p)| p)))
    }

    /// Smallest rectangle covering the pixel cells of every vertex.
    pub fn bounds(&self) -> Rect {
        *self
            .bounds
            .get_or_init(|| pixel_bounds(self.iter().map(|(_, p)| p)))
    }

    /// Snapshot into an immutable [`Contour`]; rings with fewer than three
    /// vertices are not contours and yield `None`.
    pub fn freeze(&self) -> Option<Contour> {
        if self.len < 3 {
            return None;
        }
        Some(Contour {
            points: self.iter().map(|(_, p)| p).collect(),
            area: self.area(),
            bounds: self.bounds(),
        })
    }
}

fn shoelace(points: impl Iterator<Item = Point2<f64>>) -> f64 {
    let pts: Vec<Point2<f64>> = points.collect();
    let n = pts.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let a = pts[i];
            let b = pts[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum();
    (twice * 0.5).abs()
}

fn pixel_bounds(points: impl Iterator<Item = Point2<f64>>) -> Rect {
    let (mut x0, mut y0) = (f64::INFINITY, f64::INFINITY);
    let (mut x1, mut y1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    Rect::new(x0, y0, x1 - x0 + 1.0, y1 - y0 + 1.0)
}

/// Finished contour: at least three vertices in clockwise screen order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    points: Vec<Point2<f64>>,
    area: f64,
    bounds: Rect,
}

impl Contour {
    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Map pixel coordinates of an `image_width x image_height` frame to `[0, 1]`.
    pub fn normalized(&self, image_width: usize, image_height: usize) -> Self {
        let (xf, yf) = (1.0 / image_width as f64, 1.0 / image_height as f64);
        Self {
            points: self
                .points
                .iter()
                .map(|p| Point2::new(p.x * xf, p.y * yf))
                .collect(),
            area: self.area * xf * yf,
            bounds: self.bounds.scale(xf, yf),
        }
    }
}
