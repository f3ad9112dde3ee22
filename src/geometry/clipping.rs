use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{NavError, Result};
use crate::geometry::{is_point_in_polygon, segment_crossing};
use crate::math::VecExt;

/// Boolean operation applied by [`clip_polygons`].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BooleanOperation {
    #[default]
    Intersection,
    /// Subject minus clip.
    Difference,
    ExclusiveOr,
    Union,
}

/// How two polygons relate when none of their edges cross.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Containment {
    FirstContainsSecond,
    SecondContainsFirst,
    Disjoint,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ClipOutcome {
    Clipped(Vec<Vec<Vec3>>),
    /// No edge pair crosses. Clipping is a no-op and the caller picks the
    /// fallback from the containment.
    NoIntersection(Containment),
}

impl ClipOutcome {
    /// The traced loops; empty for [`ClipOutcome::NoIntersection`].
    pub fn polygons(&self) -> &[Vec<Vec3>] {
        match self {
            ClipOutcome::Clipped(polygons) => polygons,
            ClipOutcome::NoIntersection(_) => &[],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ring {
    Subject,
    Clip,
}

#[derive(Clone, Debug)]
struct ClipVertex {
    point: Vec3,
    next: usize,
    prev: usize,
    neighbor: Option<usize>,
    intersection: bool,
    entry: bool,
    visited: bool,
    alpha: f32,
    ring: Ring,
}

/// Both polygons as doubly linked rings sharing one arena. The first
/// `subject_len` slots are the subject's own corners, followed by the
/// clip polygon's; intersection vertices are appended after that.
struct ClipGraph {
    vertices: Vec<ClipVertex>,
    subject_len: usize,
    clip_len: usize,
}

impl ClipGraph {
    fn new(subject: &[Vec3], clip: &[Vec3]) -> Self {
        let mut vertices = Vec::with_capacity(subject.len() + clip.len());
        let rings = [(Ring::Subject, subject, 0), (Ring::Clip, clip, subject.len())];
        for (ring, points, base) in rings {
            let n = points.len();
            for (i, &point) in points.iter().enumerate() {
                vertices.push(ClipVertex {
                    point,
                    next: base + (i + 1) % n,
                    prev: base + (i + n - 1) % n,
                    neighbor: None,
                    intersection: false,
                    entry: false,
                    visited: false,
                    alpha: 0.0,
                    ring,
                });
            }
        }
        Self {
            vertices,
            subject_len: subject.len(),
            clip_len: clip.len(),
        }
    }

    fn ring_start(&self, ring: Ring) -> usize {
        match ring {
            Ring::Subject => 0,
            Ring::Clip => self.subject_len,
        }
    }

    /// Phase 1: splice every proper edge crossing into both rings.
    fn insert_intersections(&mut self, subject: &[Vec3], clip: &[Vec3]) -> usize {
        let mut count = 0;
        for i in 0..self.subject_len {
            let (a, b) = (subject[i], subject[(i + 1) % self.subject_len]);
            for j in 0..self.clip_len {
                let (c, d) = (clip[j], clip[(j + 1) % self.clip_len]);
                let Some((ua, ub)) = segment_crossing(a, b, c, d) else {
                    continue;
                };
                let point = a + (b - a) * ua;
                let on_subject = self.insert_after(i, point, ua, Ring::Subject);
                let on_clip = self.insert_after(self.subject_len + j, point, ub, Ring::Clip);
                self.vertices[on_subject].neighbor = Some(on_clip);
                self.vertices[on_clip].neighbor = Some(on_subject);
                count += 1;
            }
        }
        count
    }

    /// Inserts after `corner`, past any intersections already on that edge
    /// with a smaller `alpha`.
    fn insert_after(&mut self, corner: usize, point: Vec3, alpha: f32, ring: Ring) -> usize {
        let mut after = corner;
        loop {
            let next = &self.vertices[self.vertices[after].next];
            if next.intersection && next.alpha < alpha {
                after = self.vertices[after].next;
            } else {
                break;
            }
        }

        let id = self.vertices.len();
        let before = self.vertices[after].next;
        self.vertices.push(ClipVertex {
            point,
            next: before,
            prev: after,
            neighbor: None,
            intersection: true,
            entry: false,
            visited: false,
            alpha,
            ring,
        });
        self.vertices[after].next = id;
        self.vertices[before].prev = id;
        id
    }

    /// Phase 2: intersections alternate between entering and leaving
    /// `other`, starting from whether the ring's first corner is inside it.
    fn mark_entries(&mut self, ring: Ring, other: &[Vec3]) {
        let start = self.ring_start(ring);
        let mut inside = is_point_in_polygon(other, self.vertices[start].point);
        let mut id = start;
        loop {
            let vertex = &mut self.vertices[id];
            if vertex.intersection {
                vertex.entry = !inside;
                inside = !inside;
            }
            id = vertex.next;
            if id == start {
                break;
            }
        }
    }

    fn reset_visited(&mut self) {
        for vertex in &mut self.vertices {
            vertex.visited = false;
        }
    }

    /// Phase 3: walks the rings emitting closed loops. A vertex counts as
    /// an entry when its stored flag differs from the ring's inversion flag;
    /// from an entry the walk runs forward, otherwise backward.
    fn trace(
        &mut self,
        start_ring: Ring,
        invert_subject: bool,
        invert_clip: bool,
        max_steps: usize,
    ) -> Result<Vec<Vec<Vec3>>> {
        let effective_entry = |v: &ClipVertex| {
            v.entry
                ^ match v.ring {
                    Ring::Subject => invert_subject,
                    Ring::Clip => invert_clip,
                }
        };

        let mut polygons = Vec::new();
        let mut steps = 0usize;
        loop {
            let start = self
                .vertices
                .iter()
                .position(|v| {
                    v.ring == start_ring && v.intersection && !v.visited && effective_entry(v)
                });
            let Some(start) = start else {
                break;
            };

            let mut polygon = Vec::new();
            let mut current = start;
            loop {
                self.vertices[current].visited = true;
                if let Some(neighbor) = self.vertices[current].neighbor {
                    self.vertices[neighbor].visited = true;
                }
                polygon.push(self.vertices[current].point);

                let forward = effective_entry(&self.vertices[current]);
                loop {
                    current = if forward {
                        self.vertices[current].next
                    } else {
                        self.vertices[current].prev
                    };
                    steps += 1;
                    if steps > max_steps {
                        return Err(NavError::ClipDiverged(max_steps));
                    }
                    if self.vertices[current].intersection {
                        break;
                    }
                    polygon.push(self.vertices[current].point);
                }

                let Some(neighbor) = self.vertices[current].neighbor else {
                    return Err(NavError::ClipDiverged(steps));
                };
                let closed =
                    current == start || neighbor == start || self.vertices[neighbor].visited;
                current = neighbor;
                if closed {
                    break;
                }
            }
            polygons.push(dedup_loop(polygon));
        }
        Ok(polygons)
    }
}

fn dedup_loop(mut polygon: Vec<Vec3>) -> Vec<Vec3> {
    polygon.dedup_by(|a, b| a.approx_eq(*b));
    while polygon.len() > 1 && polygon[0].approx_eq(polygon[polygon.len() - 1]) {
        polygon.pop();
    }
    polygon
}

/// Greiner–Hormann clipping of two simple polygons.
///
/// When no edges cross the result is [`ClipOutcome::NoIntersection`] with
/// the containment decided by one point-in-polygon test each way. A walk
/// that does not close within `max_steps` is reported as
/// [`NavError::ClipDiverged`].
pub fn clip_polygons(
    subject: &[Vec3],
    clip: &[Vec3],
    operation: BooleanOperation,
    max_steps: usize,
) -> Result<ClipOutcome> {
    if subject.len() < 3 {
        return Err(NavError::DegeneratePolygon(subject.len()));
    }
    if clip.len() < 3 {
        return Err(NavError::DegeneratePolygon(clip.len()));
    }

    let mut graph = ClipGraph::new(subject, clip);
    let crossings = graph.insert_intersections(subject, clip);
    if crossings == 0 {
        let containment = if is_point_in_polygon(subject, clip[0]) {
            Containment::FirstContainsSecond
        } else if is_point_in_polygon(clip, subject[0]) {
            Containment::SecondContainsFirst
        } else {
            Containment::Disjoint
        };
        return Ok(ClipOutcome::NoIntersection(containment));
    }

    graph.mark_entries(Ring::Subject, clip);
    graph.mark_entries(Ring::Clip, subject);

    let polygons = match operation {
        BooleanOperation::Intersection => graph.trace(Ring::Subject, false, false, max_steps)?,
        BooleanOperation::Difference => graph.trace(Ring::Subject, true, false, max_steps)?,
        BooleanOperation::Union => graph.trace(Ring::Subject, true, true, max_steps)?,
        BooleanOperation::ExclusiveOr => {
            let mut polygons = graph.trace(Ring::Subject, true, false, max_steps)?;
            graph.reset_visited();
            polygons.extend(graph.trace(Ring::Clip, false, true, max_steps)?);
            polygons
        }
    };
    debug!("{operation:?} clip: {crossings} crossings, {} loops", polygons.len());
    Ok(ClipOutcome::Clipped(polygons))
}
