//! Planar geometry on the XZ ground plane. `y` is carried along but never
//! participates in a predicate.

pub mod clipping;
pub mod triangulation;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::math::{cross_xz, EPSILON};

/// A polygon corner together with its index in the source polygon.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub index: usize,
}

impl Vertex {
    pub fn new(position: Vec3, index: usize) -> Self {
        Self { position, index }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub a: Vertex,
    pub b: Vertex,
    pub c: Vertex,
}

impl Triangle {
    pub fn new(a: Vertex, b: Vertex, c: Vertex) -> Self {
        Self { a, b, c }
    }

    pub fn positions(&self) -> [Vec3; 3] {
        [self.a.position, self.b.position, self.c.position]
    }

    pub fn centroid(&self) -> Vec3 {
        (self.a.position + self.b.position + self.c.position) / 3.0
    }

    /// Midpoints of AB, BC and CA.
    pub fn midpoints(&self) -> [Vec3; 3] {
        let [a, b, c] = self.positions();
        [(a + b) / 2.0, (b + c) / 2.0, (c + a) / 2.0]
    }

    pub fn area(&self) -> f32 {
        let [a, b, c] = self.positions();
        triangle_area(a, b, c)
    }

    /// Inclusive of the boundary.
    pub fn contains_point(&self, point: Vec3) -> bool {
        let [a, b, c] = self.positions();
        point_in_triangle(point, a, b, c)
    }
}

/// A segment between two positions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub a: Vec3,
    pub b: Vec3,
}

impl Edge {
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self { a, b }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindingOrder {
    Clockwise,
    CounterClockwise,
}

/// Orientation from the sign of the shoelace area. Degenerate rings count
/// as counter-clockwise.
pub fn winding_order(points: &[Vec3]) -> WindingOrder {
    if signed_area(points) < 0.0 {
        WindingOrder::Clockwise
    } else {
        WindingOrder::CounterClockwise
    }
}

/// Reverses the orientation while keeping the first vertex first.
pub fn reverse_winding<T>(points: &mut [T]) {
    if points.len() > 1 {
        points[1..].reverse();
    }
}

pub fn ensure_winding(points: &mut [Vec3], order: WindingOrder) {
    if winding_order(points) != order {
        reverse_winding(points);
    }
}

/// Shoelace area, positive for counter-clockwise polygons.
pub fn signed_area(points: &[Vec3]) -> f32 {
    let n = points.len();
    let twice: f32 = (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x * b.z - b.x * a.z
        })
        .sum();
    twice / 2.0
}

pub fn polygon_area(points: &[Vec3]) -> f32 {
    signed_area(points).abs()
}

pub fn triangle_area(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    (cross_xz(b - a, c - a) / 2.0).abs()
}

/// Inclusive point-in-triangle test, independent of orientation.
pub fn point_in_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> bool {
    let d1 = cross_xz(b - a, p - a);
    let d2 = cross_xz(c - b, p - b);
    let d3 = cross_xz(a - c, p - c);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Parameters `(ua, ub)` at which the infinite lines `p1p2` and `p3p4`
/// cross, or `None` for parallel lines.
pub fn line_parameters(p1: Vec3, p2: Vec3, p3: Vec3, p4: Vec3) -> Option<(f32, f32)> {
    let denom = (p4.z - p3.z) * (p2.x - p1.x) - (p4.x - p3.x) * (p2.z - p1.z);
    if denom.abs() < EPSILON {
        return None;
    }
    let ua = ((p4.x - p3.x) * (p1.z - p3.z) - (p4.z - p3.z) * (p1.x - p3.x)) / denom;
    let ub = ((p2.x - p1.x) * (p1.z - p3.z) - (p2.z - p1.z) * (p1.x - p3.x)) / denom;
    Some((ua, ub))
}

/// Proper crossing of two segments: both parameters strictly inside the
/// segments, so touching endpoints do not count.
pub fn segment_crossing(p1: Vec3, p2: Vec3, p3: Vec3, p4: Vec3) -> Option<(f32, f32)> {
    let (ua, ub) = line_parameters(p1, p2, p3, p4)?;
    let inside = |u: f32| u > EPSILON && u < 1.0 - EPSILON;
    (inside(ua) && inside(ub)).then_some((ua, ub))
}

/// Even-odd crossing test.
pub fn is_point_in_polygon(polygon: &[Vec3], point: Vec3) -> bool {
    let n = polygon.len();
    let mut inside = false;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        if (a.z > point.z) != (b.z > point.z) {
            let x = a.x + (point.z - a.z) / (b.z - a.z) * (b.x - a.x);
            if point.x < x {
                inside = !inside;
            }
        }
    }
    inside
}

pub fn distance_to_segment(point: Vec3, a: Vec3, b: Vec3) -> f32 {
    let ab = b - a;
    let len_sq = ab.x * ab.x + ab.z * ab.z;
    if len_sq <= 0.0 {
        return xz_distance(point, a);
    }
    let t = (((point.x - a.x) * ab.x + (point.z - a.z) * ab.z) / len_sq).clamp(0.0, 1.0);
    xz_distance(point, a + ab * t)
}

pub fn is_point_on_polygon_edge(polygon: &[Vec3], point: Vec3, tolerance: f32) -> bool {
    let n = polygon.len();
    (0..n).any(|i| distance_to_segment(point, polygon[i], polygon[(i + 1) % n]) <= tolerance)
}

pub fn xz_distance(a: Vec3, b: Vec3) -> f32 {
    let (dx, dz) = (a.x - b.x, a.z - b.z);
    (dx * dx + dz * dz).sqrt()
}
