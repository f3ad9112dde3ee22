use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::SearchConfig;
use crate::error::{NavError, Result};
use crate::math::VecExt;
use crate::pathfinding::astar::{self, PathPoint, SearchSpace};
use crate::pathfinding::smooth::SmoothPath;

const DIMENSIONS: usize = 3;

/// Index of a node in the tree's arena.
pub type NodeId = usize;

#[derive(Serialize, Deserialize, Clone, Debug)]
struct KdNode {
    point: PathPoint,
    axis: usize,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

/// 3D k-d tree over path points.
///
/// Nodes live in an arena; removed slots are recycled by later inserts.
/// Along a node's axis, the left subtree holds values `<=` the node and the
/// right subtree values `>=` it. Inserting never rebalances, so a tree fed
/// sorted input degrades towards a list.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    len: usize,
    leaves: usize,
}

impl KdTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Median-split construction. The input is consumed as scratch space
    /// and reordered.
    pub fn build(mut points: Vec<PathPoint>) -> Self {
        let mut tree = Self::new();
        tree.nodes.reserve(points.len());
        tree.root = tree.build_subtree(&mut points, 0);
        debug!("built kd-tree: {} points, {} leaves", tree.len, tree.leaves);
        tree
    }

    fn build_subtree(&mut self, points: &mut [PathPoint], depth: usize) -> Option<NodeId> {
        if points.is_empty() {
            return None;
        }
        let axis = depth % DIMENSIONS;
        points.sort_by(|a, b| a.position[axis].total_cmp(&b.position[axis]));

        let median = points.len() / 2;
        let point = points[median];
        let (lower, upper) = points.split_at_mut(median);
        let left = self.build_subtree(lower, depth + 1);
        let right = self.build_subtree(&mut upper[1..], depth + 1);
        if left.is_none() && right.is_none() {
            self.leaves += 1;
        }
        Some(self.alloc(KdNode {
            point,
            axis,
            left,
            right,
        }))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Leaf count at construction time. Diagnostic only; not maintained by
    /// insert or remove.
    pub fn leaves(&self) -> usize {
        self.leaves
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn get(&self, id: NodeId) -> Option<&PathPoint> {
        self.nodes.get(id).map(|node| &node.point)
    }

    /// Every stored point, in pre-order.
    pub fn points(&self) -> Vec<&PathPoint> {
        let mut out = Vec::with_capacity(self.len);
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            out.push(&node.point);
            stack.extend(node.right);
            stack.extend(node.left);
        }
        out
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn nearest(&self, position: Vec3) -> Result<&PathPoint> {
        let (id, _) = self.nearest_id(position)?;
        Ok(&self.nodes[id].point)
    }

    pub fn nearest_with_distance(&self, position: Vec3) -> Result<(&PathPoint, f32)> {
        let (id, distance) = self.nearest_id(position)?;
        Ok((&self.nodes[id].point, distance))
    }

    pub fn nearest_id(&self, position: Vec3) -> Result<(NodeId, f32)> {
        let root = self.root.ok_or(NavError::EmptyIndex)?;
        let mut best = (root, self.nodes[root].point.position.distance(position));
        self.nearest_in(Some(root), position, &mut best);
        Ok(best)
    }

    fn nearest_in(&self, node: Option<NodeId>, position: Vec3, best: &mut (NodeId, f32)) {
        let Some(id) = node else {
            return;
        };
        let node = &self.nodes[id];
        let distance = node.point.position.distance(position);
        if distance < best.1 {
            *best = (id, distance);
        }

        let gap = position[node.axis] - node.point.position[node.axis];
        let (near, far) = if gap < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };
        self.nearest_in(near, position, best);
        if gap.abs() <= best.1 {
            self.nearest_in(far, position, best);
        }
    }

    /// All points within `radius` of `position`, boundary included.
    pub fn within_radius(&self, position: Vec3, radius: f32) -> Result<Vec<&PathPoint>> {
        if self.is_empty() {
            return Err(NavError::EmptyIndex);
        }
        Ok(self
            .ids_within_radius(position, radius)
            .into_iter()
            .map(|id| &self.nodes[id].point)
            .collect())
    }

    pub fn ids_within_radius(&self, position: Vec3, radius: f32) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.radius_in(self.root, position, radius, &mut found);
        found
    }

    fn radius_in(
        &self,
        node: Option<NodeId>,
        position: Vec3,
        radius: f32,
        found: &mut Vec<NodeId>,
    ) {
        let Some(id) = node else {
            return;
        };
        let node = &self.nodes[id];
        if node.point.position.distance(position) <= radius {
            found.push(id);
        }

        let gap = position[node.axis] - node.point.position[node.axis];
        let (near, far) = if gap < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };
        self.radius_in(near, position, radius, found);
        if gap.abs() <= radius {
            self.radius_in(far, position, radius, found);
        }
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    pub fn insert(&mut self, point: PathPoint) -> NodeId {
        let Some(mut current) = self.root else {
            let id = self.alloc(KdNode {
                point,
                axis: 0,
                left: None,
                right: None,
            });
            self.root = Some(id);
            return id;
        };

        loop {
            let node = &self.nodes[current];
            let go_left = point.position[node.axis] < node.point.position[node.axis];
            let child = if go_left { node.left } else { node.right };
            match child {
                Some(next) => current = next,
                None => {
                    let axis = (node.axis + 1) % DIMENSIONS;
                    let id = self.alloc(KdNode {
                        point,
                        axis,
                        left: None,
                        right: None,
                    });
                    let parent = &mut self.nodes[current];
                    if go_left {
                        parent.left = Some(id);
                    } else {
                        parent.right = Some(id);
                    }
                    return id;
                }
            }
        }
    }

    /// Removes one point at `position`. Returns whether anything was
    /// removed.
    pub fn remove(&mut self, position: Vec3) -> bool {
        let mut removed = false;
        self.root = self.remove_in(self.root, position, &mut removed);
        removed
    }

    fn remove_in(
        &mut self,
        node: Option<NodeId>,
        target: Vec3,
        removed: &mut bool,
    ) -> Option<NodeId> {
        let id = node?;
        let KdNode {
            point,
            axis,
            left,
            right,
        } = self.nodes[id].clone();

        if point.position.approx_eq(target) {
            *removed = true;
            if let Some(right) = right {
                // Promote the right subtree's minimum on this axis.
                let min = self.find_min(right, axis);
                let replacement = self.nodes[min].point;
                self.nodes[id].point = replacement;
                let mut dropped = false;
                self.nodes[id].right =
                    self.remove_in(Some(right), replacement.position, &mut dropped);
            } else if let Some(left) = left {
                // Same from the left; what remains of it becomes the right
                // subtree so every value stays `>=` the promoted one.
                let min = self.find_min(left, axis);
                let replacement = self.nodes[min].point;
                self.nodes[id].point = replacement;
                let mut dropped = false;
                self.nodes[id].right =
                    self.remove_in(Some(left), replacement.position, &mut dropped);
                self.nodes[id].left = None;
            } else {
                self.release(id);
                return None;
            }
            return Some(id);
        }

        let (t, v) = (target[axis], point.position[axis]);
        if t < v {
            self.nodes[id].left = self.remove_in(left, target, removed);
        } else if t > v {
            self.nodes[id].right = self.remove_in(right, target, removed);
        } else {
            // Equal keys can sit on either side after a median build.
            self.nodes[id].left = self.remove_in(left, target, removed);
            if !*removed {
                self.nodes[id].right = self.remove_in(right, target, removed);
            }
        }
        Some(id)
    }

    fn find_min(&self, id: NodeId, axis: usize) -> NodeId {
        let node = &self.nodes[id];
        if node.axis == axis {
            return match node.left {
                Some(left) => self.find_min(left, axis),
                None => id,
            };
        }
        let mut best = id;
        for child in [node.left, node.right].into_iter().flatten() {
            let candidate = self.find_min(child, axis);
            if self.nodes[candidate].point.position[axis] < self.nodes[best].point.position[axis] {
                best = candidate;
            }
        }
        best
    }

    fn alloc(&mut self, node: KdNode) -> NodeId {
        self.len += 1;
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self.len -= 1;
        self.free.push(id);
    }
}

// ============================================================================
// Search adapter
// ============================================================================

/// A tree searched with neighbors taken from a fixed radius.
pub struct TreeSpace<'a> {
    tree: &'a KdTree,
    neighbor_radius: f32,
}

impl<'a> TreeSpace<'a> {
    pub fn new(tree: &'a KdTree, node_radius: f32) -> Self {
        Self {
            tree,
            neighbor_radius: node_radius * 2.0,
        }
    }
}

impl SearchSpace for TreeSpace<'_> {
    type Node = NodeId;

    fn locate(&self, position: Vec3) -> Result<NodeId> {
        self.tree.nearest_id(position).map(|(id, _)| id)
    }

    fn point(&self, node: NodeId) -> &PathPoint {
        &self.tree.nodes[node].point
    }

    fn neighbors(&self, node: NodeId) -> Vec<NodeId> {
        let center = self.point(node).position;
        let mut ids = self.tree.ids_within_radius(center, self.neighbor_radius);
        ids.retain(|&id| id != node);
        ids
    }

    /// Euclidean distance, rounded up.
    fn heuristic(&self, from: &PathPoint, to: &PathPoint) -> i32 {
        from.position.distance(to.position).ceil() as i32
    }
}

// ============================================================================
// Pathfinder context
// ============================================================================

/// Owns the one active point cloud of a pathing session.
#[derive(Clone, Debug)]
pub struct KdTreePathfinder {
    tree: KdTree,
    config: SearchConfig,
    min_penalty: i32,
    max_penalty: i32,
}

impl KdTreePathfinder {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            tree: KdTree::new(),
            config,
            min_penalty: 0,
            max_penalty: 0,
        }
    }

    pub fn setup(&mut self, node_radius: f32, min_penalty: i32, max_penalty: i32) {
        self.tree.clear();
        self.config.node_radius = node_radius;
        self.min_penalty = min_penalty;
        self.max_penalty = max_penalty;
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    pub fn tree(&self) -> &KdTree {
        &self.tree
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn penalty_range(&self) -> (i32, i32) {
        (self.min_penalty, self.max_penalty)
    }

    pub fn add_point(&mut self, point: PathPoint) {
        self.tree.insert(point);
    }

    /// Into an empty tree the batch is median-built; otherwise each point
    /// is inserted.
    pub fn add_points(&mut self, points: Vec<PathPoint>) {
        if self.tree.is_empty() {
            self.tree = KdTree::build(points);
        } else {
            for point in points {
                self.tree.insert(point);
            }
        }
    }

    pub fn remove_point(&mut self, position: Vec3) -> bool {
        self.tree.remove(position)
    }

    /// Returns how many of the positions were found and removed.
    pub fn remove_points(&mut self, positions: &[Vec3]) -> usize {
        positions.iter().filter(|&&p| self.tree.remove(p)).count()
    }

    pub fn point_at(&self, position: Vec3) -> Result<&PathPoint> {
        self.tree.nearest(position)
    }

    /// Positions of the points a search would treat as adjacent to
    /// `position`.
    pub fn nearest_neighbors(&self, position: Vec3) -> Result<Vec<Vec3>> {
        let radius = self.config.node_radius * 2.0;
        Ok(self
            .tree
            .within_radius(position, radius)?
            .into_iter()
            .map(|p| p.position)
            .collect())
    }

    pub fn find_path(&self, start: Vec3, end: Vec3) -> Result<Vec<Vec3>> {
        let space = TreeSpace::new(&self.tree, self.config.node_radius);
        astar::find_path(&space, start, end, &self.config)
    }

    pub fn find_smooth_path(
        &self,
        start: Vec3,
        end: Vec3,
        turn_distance: f32,
        stopping_distance: f32,
    ) -> Result<SmoothPath> {
        let waypoints = self.find_path(start, end)?;
        Ok(SmoothPath::new(&waypoints, start, turn_distance, stopping_distance))
    }
}

impl Default for KdTreePathfinder {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}
