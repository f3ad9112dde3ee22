use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::ops::Add;

use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::SearchConfig;
use crate::error::Result;
use crate::math::VecExt;
use crate::pathfinding::heap::MinHeap;

/// A node of a spatial index: where it is, whether it can be entered and
/// what entering it costs on top of the distance travelled.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct PathPoint {
    pub position: Vec3,
    pub walkable: bool,
    pub penalty: i32,
}

impl PathPoint {
    pub fn new(position: Vec3, walkable: bool, penalty: i32) -> Self {
        Self {
            position,
            walkable,
            penalty,
        }
    }
}

impl Default for PathPoint {
    fn default() -> Self {
        Self::new(Vec3::ZERO, true, 0)
    }
}

/// The contract a spatial index fulfils to be searched by [`find_path`].
///
/// Searching never mutates the index: all g/h/parent bookkeeping lives in
/// the search itself.
pub trait SearchSpace {
    type Node: Copy + Eq + Hash;

    /// Resolves a world position to the indexed node that represents it.
    fn locate(&self, position: Vec3) -> Result<Self::Node>;

    fn point(&self, node: Self::Node) -> &PathPoint;

    fn neighbors(&self, node: Self::Node) -> Vec<Self::Node>;

    /// Estimated remaining cost. Manhattan distance, rounded up.
    fn heuristic(&self, from: &PathPoint, to: &PathPoint) -> i32 {
        from.position.manhattan_distance(to.position).ceil() as i32
    }
}

/// Cost of stepping onto `to`: rounded-up Manhattan distance plus the
/// destination's penalty.
pub fn move_cost(from: &PathPoint, to: &PathPoint) -> i32 {
    from.position.manhattan_distance(to.position).ceil() as i32 + to.penalty
}

// ============================================================================
// Generic search
// ============================================================================

/// Open-set entry. Ordered by f = g + h, then by h so that nodes that look
/// closer to the goal win ties.
struct OpenEntry<N, C> {
    node: N,
    g: C,
    h: C,
}

impl<N, C> OpenEntry<N, C>
where
    C: Copy + PartialOrd + Add<Output = C>,
{
    fn compare(a: &Self, b: &Self) -> Ordering {
        (a.g + a.h)
            .partial_cmp(&(b.g + b.h))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.h.partial_cmp(&b.h).unwrap_or(Ordering::Equal))
    }
}

/// Generic A* Implementation.
///
/// # Type Parameters
/// * `N` - Node type (e.g. a grid cell or an arena index).
/// * `C` - Cost type (e.g. i32, f32).
///
/// # Arguments
/// * `start` - The starting node.
/// * `goal` - The node to reach.
/// * `get_neighbors` - A closure returning the enterable (Neighbor, EdgeCost) pairs.
/// * `get_heuristic` - A closure returning the estimated cost to the goal.
/// * `max_iterations` - Expansions allowed before giving up.
///
/// Returns the total cost and the node sequence from `start` to `goal`
/// inclusive, or `None` when the goal is unreachable or the expansion cap
/// was hit.
pub fn a_star<N, C, FN, FH>(
    start: N,
    goal: N,
    mut get_neighbors: FN,
    mut get_heuristic: FH,
    max_iterations: usize,
) -> Option<(C, Vec<N>)>
where
    N: Eq + Hash + Copy,
    C: Default + Copy + PartialOrd + Add<Output = C>,
    FN: FnMut(N) -> Vec<(N, C)>,
    FH: FnMut(N) -> C,
{
    let mut open = MinHeap::new(OpenEntry::<N, C>::compare);
    let mut queued: HashSet<N> = HashSet::new();
    let mut closed: HashSet<N> = HashSet::new();
    let mut came_from: HashMap<N, N> = HashMap::new();

    open.push(OpenEntry {
        node: start,
        g: C::default(),
        h: get_heuristic(start),
    });
    queued.insert(start);

    let mut expansions = 0usize;
    while let Some(current) = open.pop() {
        queued.remove(&current.node);
        closed.insert(current.node);

        if current.node == goal {
            let mut path = vec![goal];
            let mut curr = goal;
            while let Some(&prev) = came_from.get(&curr) {
                path.push(prev);
                curr = prev;
            }
            path.reverse();
            return Some((current.g, path));
        }

        expansions += 1;
        if expansions > max_iterations {
            debug!("a* gave up after {max_iterations} expansions");
            return None;
        }

        for (neighbor, edge_cost) in get_neighbors(current.node) {
            if closed.contains(&neighbor) {
                continue;
            }
            let tentative_g = current.g + edge_cost;

            if queued.contains(&neighbor) {
                let Some(handle) = open.find(|entry| entry.node == neighbor) else {
                    continue;
                };
                let Some(entry) = open.get_mut(handle) else {
                    continue;
                };
                if tentative_g < entry.g {
                    entry.g = tentative_g;
                    came_from.insert(neighbor, current.node);
                    open.decrease_key(handle);
                }
            } else {
                came_from.insert(neighbor, current.node);
                open.push(OpenEntry {
                    node: neighbor,
                    g: tentative_g,
                    h: get_heuristic(neighbor),
                });
                queued.insert(neighbor);
            }
        }
    }

    None
}

// ============================================================================
// Index-backed search
// ============================================================================

/// Searches `space` between the nodes nearest to `start` and `target`.
///
/// Returns the simplified waypoint list, or an empty list when either
/// endpoint is blocked or no route exists within the expansion cap. Index
/// lookups on an empty or invalid index are errors.
pub fn find_path<S: SearchSpace>(
    space: &S,
    start: Vec3,
    target: Vec3,
    config: &SearchConfig,
) -> Result<Vec<Vec3>> {
    let start_node = space.locate(start)?;
    let target_node = space.locate(target)?;
    let goal = *space.point(target_node);

    if !space.point(start_node).walkable || !goal.walkable {
        debug!("path endpoint is not walkable: {start} -> {target}");
        return Ok(Vec::new());
    }

    let found = a_star(
        start_node,
        target_node,
        |node| {
            let current = space.point(node);
            space
                .neighbors(node)
                .into_iter()
                .filter_map(|n| {
                    let next = space.point(n);
                    next.walkable.then(|| (n, move_cost(current, next)))
                })
                .collect()
        },
        |node| space.heuristic(space.point(node), &goal),
        config.max_iterations,
    );

    Ok(match found {
        Some((_, nodes)) => {
            let raw: Vec<Vec3> = nodes.iter().map(|&n| space.point(n).position).collect();
            simplify_path(&raw)
        }
        None => Vec::new(),
    })
}

/// Drops every interior waypoint that continues in the direction of the
/// previous segment. The first and last waypoints always survive.
pub fn simplify_path(points: &[Vec3]) -> Vec<Vec3> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut simplified = vec![points[0]];
    for w in points.windows(3) {
        let incoming = (w[1] - w[0]).normalized();
        let outgoing = (w[2] - w[1]).normalized();
        if !incoming.approx_eq(outgoing) {
            simplified.push(w[1]);
        }
    }
    simplified.push(points[points.len() - 1]);
    simplified
}
