//! Flat `f32` buffer layouts shared with host code.
//!
//! Every packed buffer starts with its own total length so a consumer can
//! read it back without a separate size argument.

use glam::Vec3;

use crate::error::{NavError, Result};
use crate::geometry::Triangle;
use crate::pathfinding::astar::PathPoint;
use crate::pathfinding::grid::{Cell, Grid};
use crate::pathfinding::smooth::SmoothPath;

/// `[total, format, offset.x, offset.y, offset.z, width, height, min_penalty, max_penalty]`
pub const GRID_HEADER_LEN: usize = 9;
/// `[grid_x, grid_y, x, y, z, walkable, penalty]`
pub const GRID_RECORD_LEN: usize = 7;
pub const GRID_FORMAT: f32 = 0.0;
/// `[total, finish_line_index, slow_down_index]`
pub const SMOOTH_HEADER_LEN: usize = 3;
/// Look point (3) followed by its turn boundary (7).
pub const SMOOTH_RECORD_LEN: usize = 10;

fn malformed(msg: impl Into<String>) -> NavError {
    NavError::MalformedBuffer(msg.into())
}

fn flag(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Reads the leading length field and checks it against the buffer.
fn declared_len(data: &[f32], min: usize) -> Result<usize> {
    let total = *data.first().ok_or_else(|| malformed("empty buffer"))?;
    if !(total >= 0.0 && total.fract() == 0.0) {
        return Err(malformed(format!("invalid length field {total}")));
    }
    let total = total as usize;
    if total < min || total > data.len() {
        let len = data.len();
        return Err(malformed(format!("length field {total} does not fit a buffer of {len}")));
    }
    Ok(total)
}

// --- PATHS ---

/// `[n * 3 + 1, x, y, z, ...]`
pub fn pack_path(points: &[Vec3]) -> Vec<f32> {
    let mut out = Vec::with_capacity(points.len() * 3 + 1);
    out.push((points.len() * 3 + 1) as f32);
    for p in points {
        out.extend_from_slice(&[p.x, p.y, p.z]);
    }
    out
}

pub fn unpack_path(data: &[f32]) -> Result<Vec<Vec3>> {
    let total = declared_len(data, 1)?;
    if (total - 1) % 3 != 0 {
        return Err(malformed(format!("path length {total} is not 3n + 1")));
    }
    Ok(data[1..total].chunks_exact(3).map(|c| Vec3::new(c[0], c[1], c[2])).collect())
}

pub fn pack_smooth_path(path: &SmoothPath) -> Vec<f32> {
    let points = path.look_points();
    let turns = path.turn_boundaries();
    let total = points.len() * 3 + turns.len() * 7 + SMOOTH_HEADER_LEN;

    let mut out = Vec::with_capacity(total);
    out.push(total as f32);
    out.push(path.finish_line_index() as f32);
    out.push(path.slow_down_index() as f32);
    for (p, line) in points.iter().zip(turns) {
        out.extend_from_slice(&[p.x, p.y, p.z]);
        out.extend_from_slice(&[
            line.gradient,
            line.perp_gradient,
            line.p1.x,
            line.p1.y,
            line.p2.x,
            line.p2.y,
            flag(line.approach_side),
        ]);
    }
    out
}

// --- POINTS ---

/// `[x, y, z, penalty, walkable]`
pub fn pack_point(point: &PathPoint) -> Vec<f32> {
    let p = point.position;
    vec![p.x, p.y, p.z, point.penalty as f32, flag(point.walkable)]
}

fn records(
    data: &[f32],
    count: usize,
    stride: usize,
    min_stride: usize,
) -> Result<std::slice::Chunks<'_, f32>> {
    if stride < min_stride {
        return Err(malformed(format!("record stride {stride} is below {min_stride}")));
    }
    let needed = count
        .checked_mul(stride)
        .filter(|&needed| needed <= data.len())
        .ok_or_else(|| {
            let len = data.len();
            malformed(format!("{count} records of {stride} floats do not fit a buffer of {len}"))
        })?;
    Ok(data[..needed].chunks(stride))
}

/// `count` records of `stride` floats, each starting `[x, y, z, walkable, penalty]`.
/// Only a value of exactly `1` counts as walkable.
pub fn unpack_tree_points(data: &[f32], count: usize, stride: usize) -> Result<Vec<PathPoint>> {
    Ok(records(data, count, stride, 5)?
        .map(|r| PathPoint::new(Vec3::new(r[0], r[1], r[2]), r[3] == 1.0, r[4] as i32))
        .collect())
}

/// `count` records of `stride` floats, each starting `[x, y, z]`.
pub fn unpack_positions(data: &[f32], count: usize, stride: usize) -> Result<Vec<Vec3>> {
    Ok(records(data, count, stride, 3)?.map(|r| Vec3::new(r[0], r[1], r[2])).collect())
}

/// Tightly packed `[x, y, z, x, y, z, ...]` polygon vertices.
pub fn unpack_vertices(data: &[f32]) -> Result<Vec<Vec3>> {
    if data.len() % 3 != 0 {
        return Err(malformed(format!("{} floats do not form xyz triples", data.len())));
    }
    unpack_positions(data, data.len() / 3, 3)
}

fn grid_record(r: &[f32]) -> Result<(Cell, PathPoint)> {
    let coord = |v: f32| {
        if v >= 0.0 && v.fract() == 0.0 {
            Ok(v as usize)
        } else {
            Err(malformed(format!("invalid grid coordinate {v}")))
        }
    };
    let cell = (coord(r[0])?, coord(r[1])?);
    let point = PathPoint::new(Vec3::new(r[2], r[3], r[4]), r[5] != 0.0, r[6] as i32);
    Ok((cell, point))
}

/// `[n * 7 + 1, grid records...]`
pub fn unpack_grid_points(data: &[f32]) -> Result<Vec<(Cell, PathPoint)>> {
    let total = declared_len(data, 1)?;
    if (total - 1) % GRID_RECORD_LEN != 0 {
        return Err(malformed(format!("grid point batch length {total} is not 7n + 1")));
    }
    data[1..total].chunks_exact(GRID_RECORD_LEN).map(grid_record).collect()
}

// --- GRID ---

/// Header plus one record per cell, column by column. An empty grid packs
/// to an empty buffer.
pub fn export_grid(grid: &Grid) -> Vec<f32> {
    let cells = grid.export();
    if cells.is_empty() {
        return Vec::new();
    }

    let total = cells.len() * GRID_RECORD_LEN + GRID_HEADER_LEN;
    let offset = grid.offset();
    let (min_penalty, max_penalty) = grid.penalty_range();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&[
        total as f32,
        GRID_FORMAT,
        offset.x,
        offset.y,
        offset.z,
        grid.width() as f32,
        grid.height() as f32,
        min_penalty as f32,
        max_penalty as f32,
    ]);
    for ((x, y), point) in cells {
        let p = point.position;
        out.extend_from_slice(&[
            x as f32,
            y as f32,
            p.x,
            p.y,
            p.z,
            flag(point.walkable),
            point.penalty as f32,
        ]);
    }
    out
}

/// Rebuilds a grid from [`export_grid`] output, which carries exactly one
/// record per cell.
pub fn import_grid(data: &[f32]) -> Result<Grid> {
    let total = declared_len(data, GRID_HEADER_LEN)?;
    if data[1] != GRID_FORMAT {
        return Err(malformed(format!("unknown grid format {}", data[1])));
    }
    if (total - GRID_HEADER_LEN) % GRID_RECORD_LEN != 0 {
        return Err(malformed(format!("grid length {total} is not 7n + 9")));
    }

    let size = |v: f32| {
        if v >= 0.0 && v.fract() == 0.0 {
            Ok(v as usize)
        } else {
            Err(malformed(format!("invalid grid dimension {v}")))
        }
    };
    let (width, height) = (size(data[5])?, size(data[6])?);
    let records = (total - GRID_HEADER_LEN) / GRID_RECORD_LEN;
    if width.checked_mul(height) != Some(records) {
        return Err(malformed(format!("{width}x{height} grid does not match {records} records")));
    }

    let mut grid = Grid::new(
        width,
        height,
        data[7] as i32,
        data[8] as i32,
        Vec3::new(data[2], data[3], data[4]),
    );
    for record in data[GRID_HEADER_LEN..total].chunks_exact(GRID_RECORD_LEN) {
        let ((x, y), point) = grid_record(record)?;
        grid.set(x, y, point)?;
    }
    Ok(grid)
}

// --- MESHES ---

/// `[n * 9 + 1, a.xyz, b.xyz, c.xyz, ...]`, or `[1]` when there is no mesh.
pub fn pack_triangles(triangles: Option<&[Triangle]>) -> Vec<f32> {
    let Some(triangles) = triangles else {
        return vec![1.0];
    };
    let mut out = Vec::with_capacity(triangles.len() * 9 + 1);
    out.push((triangles.len() * 9 + 1) as f32);
    for triangle in triangles {
        for p in triangle.positions() {
            out.extend_from_slice(&[p.x, p.y, p.z]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_layout() {
        let packed = pack_path(&[Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)]);
        assert_eq!(packed, vec![7.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(pack_path(&[]), vec![1.0]);
        assert_eq!(unpack_path(&packed).unwrap()[1], Vec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn smooth_path_layout() {
        let waypoints = [Vec3::new(0.0, 0.0, 4.0), Vec3::new(4.0, 0.0, 4.0)];
        let path = SmoothPath::new(&waypoints, Vec3::ZERO, 1.0, 2.0);
        let packed = pack_smooth_path(&path);

        assert_eq!(packed.len(), 2 * SMOOTH_RECORD_LEN + SMOOTH_HEADER_LEN);
        assert_eq!(packed[0], packed.len() as f32);
        assert_eq!(packed[1], 1.0);
        assert_eq!(packed[2], path.slow_down_index() as f32);

        let second = &packed[SMOOTH_HEADER_LEN + SMOOTH_RECORD_LEN..];
        assert_eq!(&second[..3], &[4.0, 0.0, 4.0]);
        let line = path.turn_boundaries()[1];
        assert_eq!(second[3], line.gradient);
        assert_eq!(second[9], flag(line.approach_side));
    }

    #[test]
    fn point_layout() {
        let point = PathPoint::new(Vec3::new(1.0, 2.0, 3.0), false, 7);
        assert_eq!(pack_point(&point), vec![1.0, 2.0, 3.0, 7.0, 0.0]);
    }

    #[test]
    fn strided_batches() {
        // stride 6: one trailing float per record is ignored
        let data = [1.0, 0.0, 1.0, 1.0, 5.0, 99.0, 2.0, 0.0, 2.0, 0.0, 3.0, 99.0];
        let points = unpack_tree_points(&data, 2, 6).unwrap();
        assert_eq!(points[0], PathPoint::new(Vec3::new(1.0, 0.0, 1.0), true, 5));
        assert_eq!(points[1], PathPoint::new(Vec3::new(2.0, 0.0, 2.0), false, 3));

        let positions = unpack_positions(&data, 2, 6).unwrap();
        assert_eq!(positions[1], Vec3::new(2.0, 0.0, 2.0));

        assert!(matches!(unpack_tree_points(&data, 3, 6), Err(NavError::MalformedBuffer(_))));
        assert!(matches!(unpack_tree_points(&data, 2, 4), Err(NavError::MalformedBuffer(_))));
    }

    #[test]
    fn huge_record_counts_are_rejected() {
        let data = [0.0; 10];
        let err = unpack_tree_points(&data, usize::MAX / 2, 5).unwrap_err();
        assert!(matches!(err, NavError::MalformedBuffer(_)));
        let err = unpack_positions(&data, usize::MAX, usize::MAX).unwrap_err();
        assert!(matches!(err, NavError::MalformedBuffer(_)));
    }

    #[test]
    fn vertex_triples() {
        let vertices = unpack_vertices(&[0.0, 0.0, 0.0, 1.0, 0.0, 2.0]).unwrap();
        assert_eq!(vertices, vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 2.0)]);
        assert!(unpack_vertices(&[0.0, 1.0]).is_err());
    }

    #[test]
    fn grid_point_batch() {
        let data = [15.0, 1.0, 2.0, 0.5, 0.0, 1.5, 1.0, 4.0, 0.0, 0.0, -1.0, 0.0, -1.0, 0.0, 0.0];
        let points = unpack_grid_points(&data).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], ((1, 2), PathPoint::new(Vec3::new(0.5, 0.0, 1.5), true, 4)));
        assert!(!points[1].1.walkable);

        assert!(unpack_grid_points(&data[..10]).is_err());
        assert!(unpack_grid_points(&[9.0, 1.0]).is_err());
    }

    #[test]
    fn grid_header_and_records() {
        let mut grid = Grid::new(2, 3, 1, 9, Vec3::new(10.0, 0.0, 20.0));
        grid.set(1, 2, PathPoint::new(grid.cell_center(1, 2), false, 6)).unwrap();
        let packed = export_grid(&grid);

        assert_eq!(packed.len(), 6 * GRID_RECORD_LEN + GRID_HEADER_LEN);
        assert_eq!(&packed[..GRID_HEADER_LEN], &[51.0, 0.0, 10.0, 0.0, 20.0, 2.0, 3.0, 1.0, 9.0]);
        // column-major: (0,0) (0,1) (0,2) (1,0) ...
        assert_eq!(&packed[GRID_HEADER_LEN + GRID_RECORD_LEN..][..2], &[0.0, 1.0]);
        let last = &packed[packed.len() - GRID_RECORD_LEN..];
        assert_eq!(&last[..2], &[1.0, 2.0]);
        assert_eq!(&last[5..], &[0.0, 6.0]);

        assert_eq!(import_grid(&packed).unwrap(), grid);
    }

    #[test]
    fn empty_grid_exports_nothing() {
        assert!(export_grid(&Grid::empty()).is_empty());
        assert!(matches!(import_grid(&[]), Err(NavError::MalformedBuffer(_))));
    }

    #[test]
    fn import_rejects_bad_headers() {
        let packed = export_grid(&Grid::new(1, 1, 0, 0, Vec3::ZERO));
        let mut tagged = packed.clone();
        tagged[1] = 3.0;
        assert!(import_grid(&tagged).is_err());
        assert!(import_grid(&packed[..GRID_HEADER_LEN + 3]).is_err());

        let mut outside = packed;
        outside[GRID_HEADER_LEN] = 4.0;
        assert!(matches!(import_grid(&outside), Err(NavError::OutOfBounds { .. })));
    }

    #[test]
    fn import_checks_dimensions_against_records() {
        let side = (1u64 << 40) as f32;
        let huge = [9.0, 0.0, 0.0, 0.0, 0.0, side, side, 0.0, 0.0];
        assert!(matches!(import_grid(&huge), Err(NavError::MalformedBuffer(_))));

        // A 2x2 header followed by a single record.
        let mut short = export_grid(&Grid::new(1, 1, 0, 0, Vec3::ZERO));
        short[5] = 2.0;
        short[6] = 2.0;
        assert!(matches!(import_grid(&short), Err(NavError::MalformedBuffer(_))));
    }

    #[test]
    fn missing_mesh_packs_to_a_single_length_field() {
        assert_eq!(pack_triangles(None), vec![1.0]);
        assert_eq!(pack_triangles(Some(&[])), vec![1.0]);
    }
}
