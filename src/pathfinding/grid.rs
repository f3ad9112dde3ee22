use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::SearchConfig;
use crate::error::{NavError, Result};
use crate::math::Matrix;
use crate::pathfinding::astar::{self, PathPoint, SearchSpace};
use crate::pathfinding::smooth::SmoothPath;

/// `(x, y)` lattice coordinate.
pub type Cell = (usize, usize);

// ============================================================================
// Grid
// ============================================================================

/// Fixed-size lattice of path points centred on a world offset.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Grid {
    cells: Matrix<PathPoint>,
    offset: Vec3,
    min_penalty: i32,
    max_penalty: i32,
}

impl Grid {
    /// Every cell starts walkable, penalty 0, at its world-space centre.
    pub fn new(
        width: usize,
        height: usize,
        min_penalty: i32,
        max_penalty: i32,
        offset: Vec3,
    ) -> Self {
        let cells = Matrix::from_fn(width, height, |x, y| {
            PathPoint::new(Self::center_of(width, height, offset, x, y), true, 0)
        });
        Self {
            cells,
            offset,
            min_penalty,
            max_penalty,
        }
    }

    pub fn empty() -> Self {
        Self::new(0, 0, 0, 0, Vec3::ZERO)
    }

    pub fn width(&self) -> usize {
        self.cells.width()
    }

    pub fn height(&self) -> usize {
        self.cells.height()
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn penalty_range(&self) -> (i32, i32) {
        (self.min_penalty, self.max_penalty)
    }

    pub fn set_penalty_range(&mut self, min_penalty: i32, max_penalty: i32) {
        self.min_penalty = min_penalty;
        self.max_penalty = max_penalty;
    }

    /// World position that [`Grid::cell_of`] maps back onto `(x, y)`.
    pub fn cell_center(&self, x: usize, y: usize) -> Vec3 {
        Self::center_of(self.width(), self.height(), self.offset, x, y)
    }

    fn center_of(width: usize, height: usize, offset: Vec3, x: usize, y: usize) -> Vec3 {
        let half_w = (width as f32 - 1.0) / 2.0;
        let half_h = (height as f32 - 1.0) / 2.0;
        offset + Vec3::new(x as f32 - half_w, 0.0, y as f32 - half_h)
    }

    pub fn find(&self, x: usize, y: usize) -> Result<&PathPoint> {
        self.cells.get(x, y).ok_or(self.out_of_bounds(x, y))
    }

    /// Overwrites the point stored at `(x, y)`.
    pub fn set(&mut self, x: usize, y: usize, point: PathPoint) -> Result<()> {
        let err = self.out_of_bounds(x, y);
        let cell = self.cells.get_mut(x, y).ok_or(err)?;
        *cell = point;
        Ok(())
    }

    /// Maps a world position onto the lattice. Positions outside the grid
    /// clamp to the nearest border cell.
    pub fn cell_of(&self, world: Vec3) -> Result<Cell> {
        if self.is_empty() {
            return Err(NavError::EmptyIndex);
        }
        let local = world - self.offset;
        let (w, h) = (self.width() as f32, self.height() as f32);
        let px = ((local.x + w / 2.0) / w).clamp(0.0, 1.0);
        let py = ((local.z + h / 2.0) / h).clamp(0.0, 1.0);
        let x = ((w - 1.0) * px).round() as usize;
        let y = ((h - 1.0) * py).round() as usize;
        Ok((x, y))
    }

    pub fn from_world(&self, world: Vec3) -> Result<&PathPoint> {
        let (x, y) = self.cell_of(world)?;
        self.find(x, y)
    }

    /// The up to eight cells surrounding `(x, y)`.
    pub fn neighbors(&self, x: usize, y: usize) -> Result<Vec<Cell>> {
        if !self.cells.contains(x, y) {
            return Err(self.out_of_bounds(x, y));
        }
        Ok(self.lattice_neighbors(x, y))
    }

    fn lattice_neighbors(&self, x: usize, y: usize) -> Vec<Cell> {
        let mut out = Vec::with_capacity(8);
        for dx in -1isize..=1 {
            for dy in -1isize..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as isize + dx;
                let ny = y as isize + dy;
                if nx >= 0 && ny >= 0 && self.cells.contains(nx as usize, ny as usize) {
                    out.push((nx as usize, ny as usize));
                }
            }
        }
        out
    }

    /// Every cell with its coordinate, column by column.
    pub fn export(&self) -> Vec<(Cell, PathPoint)> {
        let mut out = Vec::with_capacity(self.width() * self.height());
        for x in 0..self.width() {
            for y in 0..self.height() {
                out.push(((x, y), self.cells[(x, y)]));
            }
        }
        out
    }

    /// Box-blurs the penalties in place with a `(2 * size + 1)` kernel and
    /// returns the new `(min, max)` penalty.
    ///
    /// Runs as two sliding-window passes. Samples past the border repeat
    /// the edge cell.
    pub fn blur_weights(&mut self, size: usize) -> (i32, i32) {
        if self.is_empty() {
            return self.penalty_range();
        }

        let (w, h) = (self.width(), self.height());
        let ext = size as isize;
        let kernel = (2 * size + 1) as f64;
        let clamp = |v: isize, len: usize| v.clamp(0, len as isize - 1) as usize;

        let penalties = Matrix::from_fn(w, h, |x, y| self.cells[(x, y)].penalty as i64);
        let mut horizontal = Matrix::<i64>::new(w, h);
        for y in 0..h {
            let mut sum: i64 = (-ext..=ext).map(|x| penalties[(clamp(x, w), y)]).sum();
            horizontal[(0, y)] = sum;
            for x in 1..w {
                let removed = clamp(x as isize - ext - 1, w);
                let added = clamp(x as isize + ext, w);
                sum += penalties[(added, y)] - penalties[(removed, y)];
                horizontal[(x, y)] = sum;
            }
        }

        let mut blurred = Matrix::<i32>::new(w, h);
        for x in 0..w {
            let mut sum: i64 = (-ext..=ext).map(|y| horizontal[(x, clamp(y, h))]).sum();
            blurred[(x, 0)] = (sum as f64 / (kernel * kernel)).round() as i32;
            for y in 1..h {
                let removed = clamp(y as isize - ext - 1, h);
                let added = clamp(y as isize + ext, h);
                sum += horizontal[(x, added)] - horizontal[(x, removed)];
                blurred[(x, y)] = (sum as f64 / (kernel * kernel)).round() as i32;
            }
        }

        let mut min_penalty = i32::MAX;
        let mut max_penalty = i32::MIN;
        for (cell, penalty) in self.cells.iter_mut().zip(blurred.iter()) {
            cell.penalty = *penalty;
            min_penalty = min_penalty.min(*penalty);
            max_penalty = max_penalty.max(*penalty);
        }
        self.min_penalty = min_penalty;
        self.max_penalty = max_penalty;
        debug!("blurred {w}x{h} grid with kernel {size}: penalties {min_penalty}..={max_penalty}");
        (min_penalty, max_penalty)
    }

    fn out_of_bounds(&self, x: usize, y: usize) -> NavError {
        NavError::OutOfBounds {
            x,
            y,
            width: self.width(),
            height: self.height(),
        }
    }
}

impl SearchSpace for Grid {
    type Node = Cell;

    fn locate(&self, position: Vec3) -> Result<Cell> {
        self.cell_of(position)
    }

    fn point(&self, (x, y): Cell) -> &PathPoint {
        &self.cells[(x, y)]
    }

    fn neighbors(&self, (x, y): Cell) -> Vec<Cell> {
        self.lattice_neighbors(x, y)
    }
}

// ============================================================================
// Pathfinder context
// ============================================================================

/// Owns the one active grid of a pathing session.
#[derive(Clone, Debug)]
pub struct GridPathfinder {
    grid: Grid,
    config: SearchConfig,
}

impl GridPathfinder {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            grid: Grid::empty(),
            config,
        }
    }

    pub fn setup(
        &mut self,
        width: usize,
        height: usize,
        min_penalty: i32,
        max_penalty: i32,
        offset: Vec3,
    ) {
        self.grid = Grid::new(width, height, min_penalty, max_penalty, offset);
    }

    /// Drops the grid entirely; call [`GridPathfinder::setup`] before adding
    /// points again.
    pub fn clear(&mut self) {
        self.grid = Grid::empty();
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Replaces the whole grid, as an import does.
    pub fn replace_grid(&mut self, grid: Grid) {
        self.grid = grid;
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn add_grid_point(&mut self, (x, y): Cell, point: PathPoint) -> Result<()> {
        self.grid.set(x, y, point)
    }

    pub fn add_grid_points(&mut self, points: &[(Cell, PathPoint)]) -> Result<()> {
        for &(cell, point) in points {
            self.add_grid_point(cell, point)?;
        }
        Ok(())
    }

    pub fn point_at(&self, world: Vec3) -> Result<&PathPoint> {
        self.grid.from_world(world)
    }

    pub fn grid_point(&self, x: usize, y: usize) -> Result<&PathPoint> {
        self.grid.find(x, y)
    }

    pub fn find_path(&self, start: Vec3, end: Vec3) -> Result<Vec<Vec3>> {
        astar::find_path(&self.grid, start, end, &self.config)
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

    pub fn blur_weights(&mut self, size: usize) -> (i32, i32) {
        self.grid.blur_weights(size)
    }
}

impl Default for GridPathfinder {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_centers_round_trip() {
        for (w, h) in [(5, 5), (4, 7), (1, 3), (10, 2)] {
            let grid = Grid::new(w, h, 0, 0, Vec3::new(12.5, 3.0, -40.0));
            for x in 0..w {
                for y in 0..h {
                    let center = grid.cell_center(x, y);
                    assert_eq!(grid.cell_of(center).unwrap(), (x, y), "{w}x{h} at ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn far_positions_clamp_to_border() {
        let grid = Grid::new(4, 4, 0, 0, Vec3::ZERO);
        assert_eq!(grid.cell_of(Vec3::new(-1e6, 0.0, 1e6)).unwrap(), (0, 3));
    }

    #[test]
    fn neighbor_counts() {
        let grid = Grid::new(3, 3, 0, 0, Vec3::ZERO);
        assert_eq!(grid.neighbors(1, 1).unwrap().len(), 8);
        assert_eq!(grid.neighbors(0, 0).unwrap().len(), 3);
        assert_eq!(grid.neighbors(2, 1).unwrap().len(), 5);
        assert!(matches!(grid.neighbors(3, 0), Err(NavError::OutOfBounds { .. })));
    }

    #[test]
    fn empty_grid_lookups_fail() {
        let grid = Grid::empty();
        assert!(matches!(grid.from_world(Vec3::ZERO), Err(NavError::EmptyIndex)));
        assert!(matches!(grid.find(0, 0), Err(NavError::OutOfBounds { .. })));
    }

    #[test]
    fn uniform_blur_is_identity() {
        for size in 0..4 {
            let mut grid = Grid::new(6, 4, 0, 0, Vec3::ZERO);
            for cell in grid.cells.iter_mut() {
                cell.penalty = 7;
            }
            assert_eq!(grid.blur_weights(size), (7, 7));
            assert!(grid.cells.iter().all(|c| c.penalty == 7));
        }
    }

    #[test]
    fn blur_spreads_a_spike() {
        let mut grid = Grid::new(5, 5, 0, 90, Vec3::ZERO);
        grid.cells[(2, 2)].penalty = 90;
        let (min, max) = grid.blur_weights(1);
        assert_eq!(max, 10);
        assert_eq!(min, 0);
        assert_eq!(grid.find(1, 1).unwrap().penalty, 10);
        assert_eq!(grid.find(0, 0).unwrap().penalty, 0);
    }

    #[test]
    fn export_walks_columns_first() {
        let grid = Grid::new(2, 3, 0, 0, Vec3::ZERO);
        let cells: Vec<Cell> = grid.export().into_iter().map(|(c, _)| c).collect();
        assert_eq!(cells, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
    }
}
