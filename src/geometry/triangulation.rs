use std::collections::VecDeque;

use glam::Vec3;
use log::debug;

use crate::error::{NavError, Result};
use crate::geometry::{
    ensure_winding, point_in_triangle, reverse_winding, triangle_area, winding_order, Triangle,
    Vertex, WindingOrder,
};
use crate::math::{cross_xz, VecExt, EPSILON};

// ============================================================================
// Ear clipping
// ============================================================================

/// Cyclic ring over polygon corners with the convex/reflex bookkeeping ear
/// clipping needs. Ring slots are stable; removed corners are unlinked.
struct EarRing {
    vertices: Vec<Vertex>,
    prev: Vec<usize>,
    next: Vec<usize>,
    reflex: Vec<bool>,
    removed: Vec<bool>,
    remaining: usize,
}

impl EarRing {
    fn new(vertices: Vec<Vertex>) -> Self {
        let n = vertices.len();
        let mut ring = Self {
            prev: (0..n).map(|i| (i + n - 1) % n).collect(),
            next: (0..n).map(|i| (i + 1) % n).collect(),
            reflex: vec![false; n],
            removed: vec![false; n],
            remaining: n,
            vertices,
        };
        for i in 0..n {
            ring.reflex[i] = !ring.is_convex(i);
        }
        ring
    }

    fn position(&self, i: usize) -> Vec3 {
        self.vertices[i].position
    }

    fn is_convex(&self, i: usize) -> bool {
        let prev = self.position(self.prev[i]);
        let current = self.position(i);
        let next = self.position(self.next[i]);
        let incoming = (current - prev).normalized();
        let outgoing = (next - current).normalized();
        cross_xz(incoming, outgoing) >= 0.0
    }

    /// A convex corner whose triangle with its neighbours holds no reflex
    /// corner. Corners sharing a position with the triangle (the two sides
    /// of a hole bridge) do not block.
    fn is_ear(&self, i: usize) -> bool {
        if self.reflex[i] {
            return false;
        }
        let (p, n) = (self.prev[i], self.next[i]);
        let (a, b, c) = (self.position(p), self.position(i), self.position(n));

        let mut r = self.next[n];
        while r != p {
            if self.reflex[r] {
                let point = self.position(r);
                let shared = point.approx_eq(a) || point.approx_eq(b) || point.approx_eq(c);
                if !shared && point_in_triangle(point, a, b, c) {
                    return false;
                }
            }
            r = self.next[r];
        }
        true
    }

    fn unlink(&mut self, i: usize) {
        let (p, n) = (self.prev[i], self.next[i]);
        self.next[p] = n;
        self.prev[n] = p;
        self.removed[i] = true;
        self.remaining -= 1;
    }
}

/// Ear-clips a simple polygon, reorienting it counter-clockwise first.
/// Triangle vertices carry their index in `polygon`.
///
/// Fails when the polygon has fewer than three corners or when no ear is
/// left before the last triangle (self-intersecting input).
pub fn triangulate(polygon: &[Vec3]) -> Result<Vec<Triangle>> {
    if polygon.len() < 3 {
        return Err(NavError::DegeneratePolygon(polygon.len()));
    }

    let mut vertices: Vec<Vertex> = polygon
        .iter()
        .enumerate()
        .map(|(i, &p)| Vertex::new(p, i))
        .collect();
    if winding_order(polygon) == WindingOrder::Clockwise {
        reverse_winding(&mut vertices);
    }

    let triangles = clip_ears(EarRing::new(vertices))?;
    debug!("triangulated {} corners into {} triangles", polygon.len(), triangles.len());
    Ok(triangles)
}

fn clip_ears(mut ring: EarRing) -> Result<Vec<Triangle>> {
    let mut ears: VecDeque<usize> = (0..ring.vertices.len()).filter(|&i| ring.is_ear(i)).collect();
    let mut triangles = Vec::with_capacity(ring.remaining.saturating_sub(2));

    while ring.remaining > 3 {
        let Some(ear) = ears.pop_front() else {
            return Err(NavError::EarsExhausted {
                remaining: ring.remaining,
            });
        };
        let (prev, next) = (ring.prev[ear], ring.next[ear]);
        triangles.push(Triangle::new(ring.vertices[ear], ring.vertices[next], ring.vertices[prev]));
        ring.unlink(ear);

        for neighbor in [prev, next] {
            if ring.reflex[neighbor] && ring.is_convex(neighbor) {
                ring.reflex[neighbor] = false;
            }
            let queued = ears.iter().position(|&e| e == neighbor);
            match (ring.is_ear(neighbor), queued) {
                (true, None) => ears.push_front(neighbor),
                (false, Some(at)) => {
                    ears.remove(at);
                }
                _ => {}
            }
        }
    }

    if let Some(first) = ring.removed.iter().position(|removed| !removed) {
        let second = ring.next[first];
        let third = ring.next[second];
        let [a, b, c] = [first, second, third].map(|i| ring.vertices[i]);
        triangles.push(Triangle::new(a, b, c));
    }
    Ok(triangles)
}

// ============================================================================
// Hole cutting
// ============================================================================

/// Merges `hole` into `outer` through a bridge edge, producing one polygon
/// that walks the outer boundary counter-clockwise and the hole clockwise.
///
/// The bridge runs from the hole's rightmost corner M to a visible outer
/// corner P. P is the far end of the first outer edge hit by a ray cast
/// from M along +X. If reflex outer corners lie inside triangle M, I, P
/// (I being the hit point), the one best aligned with the ray is used
/// instead.
pub fn cut_hole(outer: &[Vec3], hole: &[Vec3]) -> Result<Vec<Vec3>> {
    if outer.len() < 3 {
        return Err(NavError::DegeneratePolygon(outer.len()));
    }
    if hole.len() < 3 {
        return Err(NavError::DegeneratePolygon(hole.len()));
    }

    let mut outer = outer.to_vec();
    ensure_winding(&mut outer, WindingOrder::CounterClockwise);
    let mut hole = hole.to_vec();
    ensure_winding(&mut hole, WindingOrder::Clockwise);

    let mut m_index = 0;
    for (i, p) in hole.iter().enumerate() {
        if p.x > hole[m_index].x {
            m_index = i;
        }
    }
    let m = hole[m_index];

    let n = outer.len();
    let mut hit: Option<(f32, usize)> = None;
    for i in 0..n {
        let (a, b) = (outer[i], outer[(i + 1) % n]);
        if a.x <= m.x && b.x <= m.x {
            continue;
        }
        let spans = (a.z <= m.z && b.z >= m.z) || (b.z <= m.z && a.z >= m.z);
        if !spans {
            continue;
        }
        let x = if (b.z - a.z).abs() < EPSILON {
            a.x.min(b.x).max(m.x)
        } else {
            a.x + (m.z - a.z) / (b.z - a.z) * (b.x - a.x)
        };
        let t = x - m.x;
        if t < 0.0 {
            continue;
        }
        if hit.map_or(true, |(best, _)| t < best) {
            hit = Some((t, i));
        }
    }
    let Some((t, edge)) = hit else {
        return Err(NavError::HoleNotBridged);
    };

    let intersection = m + Vec3::X * t;
    let (a_index, b_index) = (edge, (edge + 1) % n);
    let mut p_index = if intersection.approx_eq(outer[a_index]) {
        a_index
    } else if intersection.approx_eq(outer[b_index]) {
        b_index
    } else if outer[b_index].x > outer[a_index].x {
        b_index
    } else {
        a_index
    };

    let p = outer[p_index];
    if triangle_area(m, intersection, p) > EPSILON {
        let mut best_alignment = -1.0;
        for i in 0..n {
            if i == p_index || !is_reflex(&outer, i) {
                continue;
            }
            let r = outer[i];
            if !point_in_triangle(r, m, intersection, p) {
                continue;
            }
            let alignment = (r - m).normalized().dot(Vec3::X);
            if alignment > best_alignment {
                best_alignment = alignment;
                p_index = i;
            }
        }
    }

    let mut merged = Vec::with_capacity(n + hole.len() + 2);
    merged.extend_from_slice(&outer[..=p_index]);
    merged.extend((0..=hole.len()).map(|k| hole[(m_index + k) % hole.len()]));
    merged.push(outer[p_index]);
    merged.extend_from_slice(&outer[p_index + 1..]);
    debug!("bridged {}-corner hole at {} to outer corner {}", hole.len(), m, outer[p_index]);
    Ok(merged)
}

fn is_reflex(polygon: &[Vec3], i: usize) -> bool {
    let n = polygon.len();
    let prev = polygon[(i + n - 1) % n];
    let next = polygon[(i + 1) % n];
    let incoming = (polygon[i] - prev).normalized();
    let outgoing = (next - polygon[i]).normalized();
    cross_xz(incoming, outgoing) < 0.0
}
