use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::geometry::Edge;
use crate::math::PointKey;
use crate::pathfinding::astar::{self, simplify_path};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct GraphEdge {
    pub to: usize,
    pub distance: f32,
    pub penalty: i32,
}

/// Undirected graph over positions. Vertices are deduplicated by their
/// quantized [`PointKey`], so the same position added twice is one vertex.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct VertexGraph {
    vertices: Vec<Vec3>,
    #[serde(skip)]
    index: HashMap<PointKey, usize>,
    adjacency: Vec<Vec<GraphEdge>>,
}

impl VertexGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(vertices: &[Vec3], edges: &[Edge]) -> Self {
        let mut graph = Self::new();
        for &vertex in vertices {
            graph.add_vertex(vertex);
        }
        for edge in edges {
            graph.add_edge(edge.a, edge.b);
        }
        graph
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn contains(&self, position: Vec3) -> bool {
        self.lookup(position).is_some()
    }

    fn lookup(&self, position: Vec3) -> Option<&usize> {
        self.index.get(&PointKey::from(position))
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Returns the id of the vertex at `position`, adding it if new.
    pub fn add_vertex(&mut self, position: Vec3) -> usize {
        let key = PointKey::from(position);
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.vertices.len();
        self.vertices.push(position);
        self.adjacency.push(Vec::new());
        self.index.insert(key, id);
        id
    }

    /// Links two existing vertices both ways. Returns `false` when either
    /// endpoint is unknown; repeated edges are ignored.
    pub fn add_edge(&mut self, a: Vec3, b: Vec3) -> bool {
        let (Some(&from), Some(&to)) = (self.lookup(a), self.lookup(b)) else {
            return false;
        };
        if from == to {
            return true;
        }
        let distance = self.vertices[from].distance(self.vertices[to]);
        for (x, y) in [(from, to), (to, from)] {
            if !self.adjacency[x].iter().any(|edge| edge.to == y) {
                self.adjacency[x].push(GraphEdge {
                    to: y,
                    distance,
                    penalty: 0,
                });
            }
        }
        true
    }

    pub fn neighbors(&self, position: Vec3) -> Vec<Vec3> {
        self.lookup(position)
            .map(|&id| self.adjacency[id].iter().map(|edge| self.vertices[edge.to]).collect())
            .unwrap_or_default()
    }

    /// Cheapest route between two vertices, weighted by edge length plus
    /// penalty. With `exact` every visited vertex is returned, otherwise
    /// straight runs are collapsed. Unknown endpoints or no route give an
    /// empty list.
    pub fn find_shortest(
        &self,
        start: Vec3,
        target: Vec3,
        exact: bool,
        max_iterations: usize,
    ) -> Vec<Vec3> {
        let (Some(&from), Some(&to)) = (self.lookup(start), self.lookup(target)) else {
            return Vec::new();
        };
        let goal = self.vertices[to];

        let found = astar::a_star(
            from,
            to,
            |id: usize| {
                self.adjacency[id]
                    .iter()
                    .map(|edge| (edge.to, edge.distance + edge.penalty as f32))
                    .collect()
            },
            |id: usize| self.vertices[id].distance(goal),
            max_iterations,
        );

        let Some((_, ids)) = found else {
            return Vec::new();
        };
        let points: Vec<Vec3> = ids.into_iter().map(|id| self.vertices[id]).collect();
        if exact {
            points
        } else {
            simplify_path(&points)
        }
    }

    /// Restores the position lookup after deserialization.
    pub fn reindex(&mut self) {
        self.index = self
            .vertices
            .iter()
            .enumerate()
            .map(|(id, &v)| (PointKey::from(v), id))
            .collect();
    }
}
