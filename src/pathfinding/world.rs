use glam::Vec3;
use log::{debug, trace, warn};

use crate::config::NavConfig;
use crate::error::{NavError, Result};
use crate::geometry::Triangle;
use crate::math::VecExt;
use crate::pathfinding::astar;
use crate::pathfinding::navmesh::NavMesh;

/// A collection of finalized meshes plus the graph that links them.
///
/// Meshes are built one at a time: `start_mesh`, any number of clips, then
/// `end_mesh`. Two finished meshes are connected when a boundary vertex of
/// one lies inside or on the edge of the other; paths between meshes follow
/// that connection graph centroid to centroid.
#[derive(Debug, Default)]
pub struct NavMeshWorld {
    meshes: Vec<NavMesh>,
    pending: Option<NavMesh>,
    /// Indices of the meshes each mesh touches, parallel to `meshes`.
    links: Vec<Vec<usize>>,
    config: NavConfig,
}

impl NavMeshWorld {
    pub fn new(config: NavConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn mesh(&self, index: usize) -> Option<&NavMesh> {
        self.meshes.get(index)
    }

    pub fn meshes(&self) -> &[NavMesh] {
        &self.meshes
    }

    /// Indices of the meshes linked to mesh `index`.
    pub fn links(&self, index: usize) -> &[usize] {
        self.links.get(index).map(Vec::as_slice).unwrap_or_default()
    }

    // --- MESH CONSTRUCTION ---

    /// Opens a new mesh. An unfinished mesh still in progress is discarded.
    pub fn start_mesh(&mut self, boundary: Vec<Vec3>) {
        if self.pending.is_some() {
            warn!("starting a new mesh discards the unfinished one");
        }
        self.pending = Some(NavMesh::with_config(boundary, self.config.clone()));
    }

    pub fn clip_edge(&mut self, polygon: &[Vec3]) -> Result<bool> {
        self.pending.as_mut().ok_or(NavError::NoMeshInProgress)?.clip_edge(polygon)
    }

    pub fn clip_hole(&mut self, hole: &[Vec3]) -> Result<()> {
        self.pending.as_mut().ok_or(NavError::NoMeshInProgress)?.clip_hole(hole)
    }

    /// Triangulates the mesh in progress, registers it and links it to every
    /// mesh it touches. Returns the new mesh's index.
    ///
    /// A mesh that fails to triangulate is dropped.
    pub fn end_mesh(&mut self) -> Result<usize> {
        let mut mesh = self.pending.take().ok_or(NavError::NoMeshInProgress)?;
        mesh.triangulate()?;

        let index = self.meshes.len();
        let mut links = Vec::new();
        for (other, existing) in self.meshes.iter().enumerate() {
            if touches(&mesh, existing) {
                links.push(other);
                self.links[other].push(index);
                debug!("mesh {index} connects to mesh {other}");
            }
        }
        self.meshes.push(mesh);
        self.links.push(links);
        Ok(index)
    }

    pub fn debug_triangles(&self, index: usize) -> Option<&[Triangle]> {
        self.meshes.get(index).map(NavMesh::triangles)
    }

    // --- PATHFINDING ---

    fn owner_of(&self, point: Vec3) -> Option<usize> {
        self.meshes.iter().position(|mesh| mesh.has_point(point))
    }

    /// Mesh indices from `from` to `to`, weighted by centroid distance.
    fn mesh_route(&self, from: usize, to: usize) -> Vec<usize> {
        let goal = self.meshes[to].centroid();
        let found = astar::a_star(
            from,
            to,
            |i: usize| {
                let centroid = self.meshes[i].centroid();
                self.links[i]
                    .iter()
                    .map(|&j| (j, centroid.distance(self.meshes[j].centroid())))
                    .collect()
            },
            |i: usize| self.meshes[i].centroid().distance(goal),
            self.config.search.max_iterations,
        );
        found.map(|(_, route)| route).unwrap_or_default()
    }

    /// Path from `start` to `end`, possibly crossing several meshes.
    ///
    /// Each endpoint belongs to the first mesh that contains it; an endpoint
    /// outside every mesh, or meshes with no connecting route, give an empty
    /// path. Across meshes the route is stitched leg by leg: each mesh is
    /// crossed from where the previous leg ended towards the next mesh's
    /// centroid, and the last mesh towards `end`.
    pub fn get_path(&self, start: Vec3, end: Vec3) -> Result<Vec<Vec3>> {
        let (Some(first), Some(last)) = (self.owner_of(start), self.owner_of(end)) else {
            debug!("path endpoint is outside every mesh: {start} -> {end}");
            return Ok(Vec::new());
        };

        if first == last {
            return self.meshes[first].find_path(start, end);
        }

        let route = self.mesh_route(first, last);
        if route.is_empty() {
            debug!("no mesh route from mesh {first} to mesh {last}");
            return Ok(Vec::new());
        }

        let mut path: Vec<Vec3> = Vec::new();
        for (i, &index) in route.iter().enumerate() {
            let from = path.last().copied().unwrap_or(start);
            let to = route.get(i + 1).map_or(end, |&next| self.meshes[next].centroid());
            let leg = self.meshes[index].find_path(from, to)?;
            trace!("leg {i} through mesh {index}: {} waypoints", leg.len());

            for point in leg {
                if path.last().map_or(true, |last| !last.approx_eq(point)) {
                    path.push(point);
                }
            }
        }
        Ok(path)
    }
}

/// Any boundary vertex of either mesh inside or on the edge of the other.
fn touches(a: &NavMesh, b: &NavMesh) -> bool {
    let reaches =
        |from: &NavMesh, into: &NavMesh| from.edge_vertices().iter().any(|&p| into.has_point(p));
    reaches(a, b) || reaches(b, a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(min_x: f32, min_z: f32, max_x: f32, max_z: f32) -> Vec<Vec3> {
        vec![
            Vec3::new(min_x, 0.0, min_z),
            Vec3::new(max_x, 0.0, min_z),
            Vec3::new(max_x, 0.0, max_z),
            Vec3::new(min_x, 0.0, max_z),
        ]
    }

    fn world_of(rects: &[[f32; 4]]) -> NavMeshWorld {
        let mut world = NavMeshWorld::default();
        for r in rects {
            world.start_mesh(rect(r[0], r[1], r[2], r[3]));
            world.end_mesh().unwrap();
        }
        world
    }

    #[test]
    fn operations_need_an_open_mesh() {
        let mut world = NavMeshWorld::default();
        assert!(matches!(world.end_mesh(), Err(NavError::NoMeshInProgress)));
        let square = rect(1.0, 1.0, 2.0, 2.0);
        assert!(matches!(world.clip_hole(&square), Err(NavError::NoMeshInProgress)));
        assert!(matches!(world.clip_edge(&square), Err(NavError::NoMeshInProgress)));
    }

    #[test]
    fn touching_meshes_are_linked() {
        let world = world_of(&[
            [0.0, 0.0, 10.0, 10.0],
            [10.0, 0.0, 20.0, 10.0],
            [50.0, 0.0, 60.0, 10.0],
        ]);
        assert_eq!(world.len(), 3);
        assert_eq!(world.links(0), &[1]);
        assert_eq!(world.links(1), &[0]);
        assert!(world.links(2).is_empty());
        assert!(world.links(9).is_empty());
    }

    #[test]
    fn meshes_sharing_a_centroid_stay_distinct() {
        // The inner square sits in the middle of the outer one: same centroid.
        let world = world_of(&[[0.0, 0.0, 20.0, 20.0], [-10.0, -10.0, 30.0, 30.0]]);
        let (inner, outer) = (world.mesh(0).unwrap(), world.mesh(1).unwrap());
        assert_eq!(inner.centroid(), outer.centroid());
        assert_eq!(world.links(0), &[1]);

        let start = Vec3::new(5.0, 0.0, 5.0);
        let end = Vec3::new(25.0, 0.0, 25.0);
        let path = world.get_path(start, end).unwrap();
        assert_eq!(path.first().copied(), Some(inner.closest_point(start).unwrap()));
        assert_eq!(path.last().copied(), Some(outer.closest_point(end).unwrap()));
        assert!(path.contains(&inner.centroid()));
    }

    #[test]
    fn crossing_strips_without_shared_corners_are_not_linked() {
        // A plus sign: neither strip has a corner inside the other.
        let world = world_of(&[[0.0, 8.0, 20.0, 12.0], [8.0, 0.0, 12.0, 20.0]]);
        assert_eq!(world.mesh(0).unwrap().centroid(), world.mesh(1).unwrap().centroid());
        assert!(world.links(0).is_empty());
        let path = world.get_path(Vec3::new(1.0, 0.0, 10.0), Vec3::new(10.0, 0.0, 19.0));
        assert!(path.unwrap().is_empty());
    }

    #[test]
    fn shared_edge_belongs_to_the_earlier_mesh() {
        let seam = Vec3::new(10.0, 0.0, 5.0);

        let world = world_of(&[[0.0, 0.0, 10.0, 10.0], [10.0, 0.0, 20.0, 10.0]]);
        assert!(world.mesh(0).unwrap().has_point(seam));
        assert!(world.mesh(1).unwrap().has_point(seam));
        assert_eq!(world.owner_of(seam), Some(0));

        let flipped = world_of(&[[10.0, 0.0, 20.0, 10.0], [0.0, 0.0, 10.0, 10.0]]);
        assert_eq!(flipped.owner_of(seam), Some(0));
        assert_eq!(flipped.owner_of(Vec3::new(5.0, 0.0, 5.0)), Some(1));
    }

    #[test]
    fn path_in_one_mesh_is_direct() {
        let world = world_of(&[[0.0, 0.0, 10.0, 10.0]]);
        let path = world.get_path(Vec3::new(0.1, 0.0, 0.1), Vec3::new(9.9, 0.0, 9.9)).unwrap();
        assert_eq!(path.first(), Some(&Vec3::ZERO));
        assert_eq!(path.last(), Some(&Vec3::new(10.0, 0.0, 10.0)));
    }

    #[test]
    fn unowned_or_unlinked_endpoints_give_no_path() {
        let world = world_of(&[[0.0, 0.0, 10.0, 10.0], [50.0, 0.0, 60.0, 10.0]]);
        let start = Vec3::new(1.0, 0.0, 1.0);
        assert!(world.get_path(start, Vec3::new(30.0, 0.0, 5.0)).unwrap().is_empty());
        assert!(world.get_path(start, Vec3::new(55.0, 0.0, 5.0)).unwrap().is_empty());
    }

    #[test]
    fn debug_triangles_by_index() {
        let world = world_of(&[[0.0, 0.0, 10.0, 10.0]]);
        assert_eq!(world.debug_triangles(0).map(<[Triangle]>::len), Some(2));
        assert!(world.debug_triangles(1).is_none());
    }
}
