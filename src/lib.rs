pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod math;
pub mod pathfinding;

use glam::Vec3;
use wasm_bindgen::prelude::*;

pub use crate::config::{MeshConfig, NavConfig, SearchConfig};
pub use crate::error::{NavError, Result};
use crate::pathfinding::astar::PathPoint;
use crate::pathfinding::grid::{Grid, GridPathfinder};
use crate::pathfinding::kdtree::KdTreePathfinder;
use crate::pathfinding::world::NavMeshWorld;

// --- SHARED HELPERS ---

type JsResult<T> = std::result::Result<T, JsValue>;

fn to_js(err: NavError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn load_config(config_json: Option<String>) -> JsResult<NavConfig> {
    // Panic hook for better error logging in browser console
    console_error_panic_hook::set_once();

    match config_json {
        Some(json) => NavConfig::from_json(&json).map_err(to_js),
        None => Ok(NavConfig::default()),
    }
}

fn pack_route(
    waypoints: Vec<Vec3>,
    start: Vec3,
    smooth: bool,
    (turn_distance, stopping_distance): (f32, f32),
) -> Vec<f32> {
    if smooth {
        let path = pathfinding::smooth::SmoothPath::new(
            &waypoints,
            start,
            turn_distance,
            stopping_distance,
        );
        export::pack_smooth_path(&path)
    } else {
        export::pack_path(&waypoints)
    }
}

// --- GRID PATHFINDING ---

/// A single penalty grid and the searches over it.
#[wasm_bindgen]
pub struct GridLinker {
    pathfinder: GridPathfinder,

    // Last `export()` result, kept alive so JS can read it in place.
    // Layout: see `export::export_grid`.
    export_buffer: Vec<f32>,
}

#[wasm_bindgen]
impl GridLinker {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> JsResult<GridLinker> {
        let config = load_config(config_json)?;
        Ok(GridLinker {
            pathfinder: GridPathfinder::new(config.search),
            export_buffer: Vec::new(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn setup(
        &mut self,
        width: usize,
        height: usize,
        min_penalty: i32,
        max_penalty: i32,
        offset_x: f32,
        offset_y: f32,
        offset_z: f32,
    ) {
        let offset = Vec3::new(offset_x, offset_y, offset_z);
        self.pathfinder.setup(width, height, min_penalty, max_penalty, offset);
    }

    pub fn clear(&mut self) {
        self.pathfinder.clear();
        self.export_buffer.clear();
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_grid_point(
        &mut self,
        x: f32,
        y: f32,
        z: f32,
        grid_x: usize,
        grid_y: usize,
        walkable: bool,
        penalty: i32,
    ) -> JsResult<()> {
        let point = PathPoint::new(Vec3::new(x, y, z), walkable, penalty);
        self.pathfinder.add_grid_point((grid_x, grid_y), point).map_err(to_js)
    }

    /// `[n * 7 + 1, records...]`, each record `[grid_x, grid_y, x, y, z, walkable, penalty]`.
    pub fn add_grid_points(&mut self, points: &[f32]) -> JsResult<()> {
        let points = export::unpack_grid_points(points).map_err(to_js)?;
        self.pathfinder.add_grid_points(&points).map_err(to_js)
    }

    /// `[x, y, z, penalty, walkable]` of the cell under a world position.
    pub fn get_grid_point(&self, x: f32, y: f32, z: f32) -> JsResult<Vec<f32>> {
        let point = self.pathfinder.point_at(Vec3::new(x, y, z)).map_err(to_js)?;
        Ok(export::pack_point(point))
    }

    pub fn get_grid_point_at(&self, grid_x: usize, grid_y: usize) -> JsResult<Vec<f32>> {
        let point = self.pathfinder.grid_point(grid_x, grid_y).map_err(to_js)?;
        Ok(export::pack_point(point))
    }

    /// A regular path, or a smoothed one when `smooth` is set. Smoothing
    /// distances left out come from the search config. "No path" is an
    /// empty path, not an error.
    #[allow(clippy::too_many_arguments)]
    pub fn find_path(
        &self,
        start_x: f32,
        start_y: f32,
        start_z: f32,
        end_x: f32,
        end_y: f32,
        end_z: f32,
        smooth: bool,
        turn_distance: Option<f32>,
        stopping_distance: Option<f32>,
    ) -> JsResult<Vec<f32>> {
        let start = Vec3::new(start_x, start_y, start_z);
        let waypoints = self
            .pathfinder
            .find_path(start, Vec3::new(end_x, end_y, end_z))
            .map_err(to_js)?;
        let distances = self.pathfinder.config().smoothing(turn_distance, stopping_distance);
        Ok(pack_route(waypoints, start, smooth, distances))
    }

    /// Returns `[min_penalty, max_penalty]` after blurring.
    pub fn blur_weights(&mut self, size: usize) -> Vec<i32> {
        let (min, max) = self.pathfinder.blur_weights(size);
        vec![min, max]
    }

    // --- IMPORT / EXPORT ---

    /// Packs the grid into the export buffer and returns its length.
    pub fn export(&mut self) -> usize {
        self.export_buffer = export::export_grid(self.pathfinder.grid());
        self.export_buffer.len()
    }

    /// Returns a pointer to the start of the Float32Array in Wasm memory.
    pub fn get_export_ptr(&self) -> *const f32 {
        self.export_buffer.as_ptr()
    }

    /// Replaces the whole grid with a previously exported one.
    pub fn import(&mut self, data: &[f32]) -> JsResult<()> {
        let grid = export::import_grid(data).map_err(to_js)?;
        self.pathfinder.replace_grid(grid);
        Ok(())
    }

    // --- SNAPSHOTS ---

    /// Serializes the grid into a JS Object.
    pub fn get_snapshot(&self) -> JsResult<JsValue> {
        serde_wasm_bindgen::to_value(self.pathfinder.grid()).map_err(Into::into)
    }

    /// Restores a grid from a JS Object.
    pub fn load_snapshot(&mut self, val: JsValue) -> JsResult<()> {
        let grid: Grid = serde_wasm_bindgen::from_value(val)?;
        self.pathfinder.replace_grid(grid);
        Ok(())
    }
}

// --- KD-TREE PATHFINDING ---

/// A point cloud searched with radius neighborhoods.
#[wasm_bindgen]
pub struct KdTreeLinker {
    pathfinder: KdTreePathfinder,
}

#[wasm_bindgen]
impl KdTreeLinker {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> JsResult<KdTreeLinker> {
        let config = load_config(config_json)?;
        Ok(KdTreeLinker {
            pathfinder: KdTreePathfinder::new(config.search),
        })
    }

    pub fn setup(&mut self, node_radius: f32, min_penalty: i32, max_penalty: i32) {
        self.pathfinder.setup(node_radius, min_penalty, max_penalty);
    }

    pub fn clear(&mut self) {
        self.pathfinder.clear();
    }

    pub fn add_point(&mut self, x: f32, y: f32, z: f32, walkable: bool, penalty: i32) {
        self.pathfinder
            .add_point(PathPoint::new(Vec3::new(x, y, z), walkable, penalty));
    }

    /// `count` records of `stride` floats: `[x, y, z, walkable, penalty, ...]`.
    pub fn add_points(&mut self, points: &[f32], count: usize, stride: usize) -> JsResult<()> {
        let points = export::unpack_tree_points(points, count, stride).map_err(to_js)?;
        self.pathfinder.add_points(points);
        Ok(())
    }

    pub fn remove_point(&mut self, x: f32, y: f32, z: f32) -> bool {
        self.pathfinder.remove_point(Vec3::new(x, y, z))
    }

    /// `count` records of `stride` floats: `[x, y, z, ...]`. Returns how
    /// many were removed.
    pub fn remove_points(
        &mut self,
        points: &[f32],
        count: usize,
        stride: usize,
    ) -> JsResult<usize> {
        let positions = export::unpack_positions(points, count, stride).map_err(to_js)?;
        Ok(self.pathfinder.remove_points(&positions))
    }

    /// `[x, y, z, penalty, walkable]` of the nearest indexed point.
    pub fn get_point(&self, x: f32, y: f32, z: f32) -> JsResult<Vec<f32>> {
        let point = self.pathfinder.point_at(Vec3::new(x, y, z)).map_err(to_js)?;
        Ok(export::pack_point(point))
    }

    pub fn get_nearest_neighbors(&self, x: f32, y: f32, z: f32) -> JsResult<Vec<f32>> {
        let neighbors = self
            .pathfinder
            .nearest_neighbors(Vec3::new(x, y, z))
            .map_err(to_js)?;
        Ok(export::pack_path(&neighbors))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn find_path(
        &self,
        start_x: f32,
        start_y: f32,
        start_z: f32,
        end_x: f32,
        end_y: f32,
        end_z: f32,
        smooth: bool,
        turn_distance: Option<f32>,
        stopping_distance: Option<f32>,
    ) -> JsResult<Vec<f32>> {
        let start = Vec3::new(start_x, start_y, start_z);
        let waypoints = self
            .pathfinder
            .find_path(start, Vec3::new(end_x, end_y, end_z))
            .map_err(to_js)?;
        let distances = self.pathfinder.config().smoothing(turn_distance, stopping_distance);
        Ok(pack_route(waypoints, start, smooth, distances))
    }
}

// --- NAVMESH ---

/// Connected navmeshes, built one at a time.
#[wasm_bindgen]
pub struct NavMeshLinker {
    world: NavMeshWorld,
}

#[wasm_bindgen]
impl NavMeshLinker {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> JsResult<NavMeshLinker> {
        let config = load_config(config_json)?;
        Ok(NavMeshLinker {
            world: NavMeshWorld::new(config),
        })
    }

    /// Drops every mesh, finished or not.
    pub fn clear(&mut self) {
        self.world = NavMeshWorld::new(self.world.config().clone());
    }

    /// Polygons are tightly packed `[x, y, z, ...]` vertices.
    pub fn start_mesh(&mut self, vertices: &[f32]) -> JsResult<()> {
        let boundary = export::unpack_vertices(vertices).map_err(to_js)?;
        self.world.start_mesh(boundary);
        Ok(())
    }

    /// Returns whether the clip was applied.
    pub fn clip_edge(&mut self, vertices: &[f32]) -> JsResult<bool> {
        let polygon = export::unpack_vertices(vertices).map_err(to_js)?;
        self.world.clip_edge(&polygon).map_err(to_js)
    }

    pub fn clip_hole(&mut self, vertices: &[f32]) -> JsResult<()> {
        let hole = export::unpack_vertices(vertices).map_err(to_js)?;
        self.world.clip_hole(&hole).map_err(to_js)
    }

    /// Finalizes the mesh in progress and returns its index.
    pub fn end_mesh(&mut self) -> JsResult<usize> {
        self.world.end_mesh().map_err(to_js)
    }

    pub fn get_debug_mesh(&self, index: usize) -> Vec<f32> {
        export::pack_triangles(self.world.debug_triangles(index))
    }

    pub fn get_path(
        &self,
        start_x: f32,
        start_y: f32,
        start_z: f32,
        end_x: f32,
        end_y: f32,
        end_z: f32,
    ) -> JsResult<Vec<f32>> {
        let start = Vec3::new(start_x, start_y, start_z);
        let end = Vec3::new(end_x, end_y, end_z);
        let path = self.world.get_path(start, end).map_err(to_js)?;
        Ok(export::pack_path(&path))
    }
}
