use std::collections::HashSet;

use glam::Vec3;
use log::{debug, warn};

use crate::config::NavConfig;
use crate::error::{NavError, Result};
use crate::geometry::clipping::{clip_polygons, BooleanOperation, ClipOutcome, Containment};
use crate::geometry::triangulation::{cut_hole, triangulate};
use crate::geometry::{is_point_in_polygon, is_point_on_polygon_edge, Edge, Triangle};
use crate::math::PointKey;
use crate::pathfinding::astar::PathPoint;
use crate::pathfinding::graph::VertexGraph;
use crate::pathfinding::kdtree::KdTree;

// ============================================================================
// Data Structures
// ============================================================================

/// One walkable polygon, built in two stages.
///
/// While open, the boundary can be clipped and holes can be cut into it.
/// [`NavMesh::triangulate`] freezes the shape and builds the lookup tree and
/// the walk graph; only then can it answer path queries.
#[derive(Clone, Debug)]
pub struct NavMesh {
    edge_vertices: Vec<Vec3>,
    /// Boundary with holes spliced in. This is what gets triangulated.
    vertices: Vec<Vec3>,
    cleaned: bool,
    finalized: bool,
    config: NavConfig,

    centroid: Vec3,
    triangles: Vec<Triangle>,
    tree: KdTree,
    graph: VertexGraph,
}

// ============================================================================
// Construction
// ============================================================================

impl NavMesh {
    pub fn new(boundary: Vec<Vec3>) -> Self {
        Self::with_config(boundary, NavConfig::default())
    }

    pub fn with_config(boundary: Vec<Vec3>, config: NavConfig) -> Self {
        Self {
            vertices: boundary.clone(),
            edge_vertices: boundary,
            cleaned: false,
            finalized: false,
            config,
            centroid: Vec3::ZERO,
            triangles: Vec::new(),
            tree: KdTree::new(),
            graph: VertexGraph::new(),
        }
    }

    /// Intersects the boundary with `polygon`.
    ///
    /// Accepted when the intersection is a single loop or when one polygon
    /// wholly contains the other. A disjoint polygon, or an intersection that
    /// splits into several loops, leaves the mesh untouched and returns
    /// `false`. The new boundary also replaces any holes cut so far.
    pub fn clip_edge(&mut self, polygon: &[Vec3]) -> Result<bool> {
        if self.finalized {
            return Err(NavError::MeshFinalized);
        }

        let outcome = clip_polygons(
            &self.edge_vertices,
            polygon,
            BooleanOperation::Intersection,
            self.config.mesh.max_clip_steps,
        )?;
        let boundary = match outcome {
            ClipOutcome::Clipped(mut loops) if loops.len() == 1 => loops.remove(0),
            ClipOutcome::Clipped(loops) => {
                warn!("edge clip produced {} loops, ignoring it", loops.len());
                return Ok(false);
            }
            ClipOutcome::NoIntersection(Containment::FirstContainsSecond) => polygon.to_vec(),
            ClipOutcome::NoIntersection(Containment::SecondContainsFirst) => return Ok(true),
            ClipOutcome::NoIntersection(Containment::Disjoint) => {
                warn!("edge clip polygon does not touch the mesh, ignoring it");
                return Ok(false);
            }
        };

        self.vertices = boundary.clone();
        self.edge_vertices = boundary;
        Ok(true)
    }

    /// Splices `hole` into the working polygon. The first call also merges
    /// boundary vertices that sit closer than the merge threshold.
    pub fn clip_hole(&mut self, hole: &[Vec3]) -> Result<()> {
        if self.finalized {
            return Err(NavError::MeshFinalized);
        }
        if !self.cleaned {
            self.clean_edges();
            self.cleaned = true;
        }
        self.vertices = cut_hole(&self.vertices, hole)?;
        Ok(())
    }

    /// Walks the ring once, folding each vertex that is too close to its
    /// successor into their midpoint. The closing edge is not checked.
    fn clean_edges(&mut self) {
        let threshold = self.config.mesh.vertex_merge_threshold;
        let mut merged = vec![false; self.vertices.len()];
        for i in 0..self.vertices.len().saturating_sub(1) {
            if self.vertices[i].distance(self.vertices[i + 1]) < threshold {
                self.vertices[i + 1] = (self.vertices[i] + self.vertices[i + 1]) / 2.0;
                merged[i] = true;
            }
        }
        let before = self.vertices.len();
        let mut flags = merged.into_iter();
        self.vertices.retain(|_| !flags.next().unwrap_or(false));
        if self.vertices.len() != before {
            debug!("merged {} close boundary vertices", before - self.vertices.len());
        }
    }

    /// Freezes the mesh: triangulates the working polygon, then indexes
    /// every triangle corner and edge midpoint (plus the centroid of
    /// triangles above the area threshold) and links them into the walk
    /// graph.
    pub fn triangulate(&mut self) -> Result<()> {
        if self.finalized {
            return Err(NavError::MeshFinalized);
        }

        let count = self.edge_vertices.len().max(1) as f32;
        self.centroid = self.edge_vertices.iter().copied().sum::<Vec3>() / count;
        self.triangles = triangulate(&self.vertices)?;

        let threshold = self.config.mesh.triangle_area_threshold;
        let mut seen = HashSet::new();
        let mut points = Vec::new();
        let mut edges = Vec::new();
        let mut add = |p: Vec3| {
            if seen.insert(PointKey::from(p)) {
                points.push(p);
            }
        };

        for triangle in &self.triangles {
            let [v1, v2, v3] = triangle.positions();
            let [m1, m2, m3] = triangle.midpoints();
            for p in [v1, v2, v3, m1, m2, m3] {
                add(p);
            }

            let fan = [(m1, v1), (v1, m3), (m3, v3), (v3, m2), (m2, v2), (v2, m1)];
            edges.extend(fan.map(|(a, b)| Edge::new(a, b)));

            if triangle.area() > threshold {
                let c = triangle.centroid();
                add(c);
                let spokes = [(m1, c), (m2, c), (m3, c), (c, v1), (c, v2), (c, v3)];
                edges.extend(spokes.map(|(a, b)| Edge::new(a, b)));
            } else {
                let inner = [(m1, m2), (m2, m3), (m3, m1)];
                edges.extend(inner.map(|(a, b)| Edge::new(a, b)));
            }
        }

        self.tree = KdTree::build(points.iter().map(|&p| PathPoint::new(p, true, 0)).collect());
        self.graph = VertexGraph::from_parts(&points, &edges);
        self.finalized = true;

        debug!(
            "navmesh finalized: {} triangles, {} graph vertices, {} graph edges",
            self.triangles.len(),
            self.graph.len(),
            self.graph.edge_count()
        );
        Ok(())
    }
}

// ============================================================================
// Queries
// ============================================================================

impl NavMesh {
    /// Route between the indexed points nearest to `start` and `target`,
    /// with straight runs collapsed.
    pub fn find_path(&self, start: Vec3, target: Vec3) -> Result<Vec<Vec3>> {
        if !self.finalized {
            return Err(NavError::MeshNotFinalized);
        }
        let from = self.tree.nearest(start)?.position;
        let to = self.tree.nearest(target)?.position;
        Ok(self.graph.find_shortest(from, to, false, self.config.search.max_iterations))
    }

    pub fn closest_point(&self, point: Vec3) -> Result<Vec3> {
        if !self.finalized {
            return Err(NavError::MeshNotFinalized);
        }
        Ok(self.tree.nearest(point)?.position)
    }

    /// Inside the outer boundary or on one of its edges. Holes are not
    /// considered.
    pub fn has_point(&self, point: Vec3) -> bool {
        is_point_in_polygon(&self.edge_vertices, point)
            || is_point_on_polygon_edge(&self.edge_vertices, point, self.config.mesh.edge_tolerance)
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Mean of the boundary vertices, set by [`NavMesh::triangulate`].
    pub fn centroid(&self) -> Vec3 {
        self.centroid
    }

    pub fn edge_vertices(&self) -> &[Vec3] {
        &self.edge_vertices
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn tree(&self) -> &KdTree {
        &self.tree
    }

    pub fn graph(&self) -> &VertexGraph {
        &self.graph
    }
}
