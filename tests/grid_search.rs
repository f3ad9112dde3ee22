use glam::Vec3;
use terrain_nav::export::{export_grid, import_grid};
use terrain_nav::pathfinding::astar::PathPoint;
use terrain_nav::pathfinding::grid::GridPathfinder;

fn uniform_grid(size: usize, penalty: i32) -> GridPathfinder {
    let mut pathfinder = GridPathfinder::default();
    pathfinder.setup(size, size, penalty, penalty, Vec3::ZERO);
    for x in 0..size {
        for y in 0..size {
            let center = pathfinder.grid().cell_center(x, y);
            pathfinder
                .add_grid_point((x, y), PathPoint::new(center, true, penalty))
                .unwrap();
        }
    }
    pathfinder
}

fn block(pathfinder: &mut GridPathfinder, x: usize, y: usize) {
    let center = pathfinder.grid().cell_center(x, y);
    pathfinder
        .add_grid_point((x, y), PathPoint::new(center, false, 0))
        .unwrap();
}

#[test]
fn uniform_grid_takes_the_diagonal() {
    let pathfinder = uniform_grid(5, 1);
    let start = pathfinder.grid().cell_center(0, 0);
    let goal = pathfinder.grid().cell_center(4, 4);

    let path = pathfinder.find_path(start, goal).unwrap();
    assert_eq!(path, vec![start, goal]);
}

#[test]
fn blocked_row_splits_the_grid() {
    let mut pathfinder = uniform_grid(5, 1);
    for x in 0..5 {
        block(&mut pathfinder, x, 2);
    }
    let start = pathfinder.grid().cell_center(0, 0);
    let goal = pathfinder.grid().cell_center(4, 4);
    assert!(pathfinder.find_path(start, goal).unwrap().is_empty());
}

#[test]
fn blocked_endpoint_gives_no_path() {
    let mut pathfinder = uniform_grid(5, 0);
    block(&mut pathfinder, 4, 4);
    let start = pathfinder.grid().cell_center(0, 0);
    let goal = pathfinder.grid().cell_center(4, 4);
    assert!(pathfinder.find_path(start, goal).unwrap().is_empty());
}

#[test]
fn expensive_column_is_crossed_at_its_cheap_cell() {
    let mut pathfinder = uniform_grid(5, 0);
    for y in 0..4 {
        let center = pathfinder.grid().cell_center(2, y);
        pathfinder
            .add_grid_point((2, y), PathPoint::new(center, true, 100))
            .unwrap();
    }

    let start = pathfinder.grid().cell_center(0, 2);
    let goal = pathfinder.grid().cell_center(4, 2);
    let path = pathfinder.find_path(start, goal).unwrap();
    assert_eq!(path.first(), Some(&start));
    assert_eq!(path.last(), Some(&goal));

    // Column 2 sits at world x = 0; its only cheap cell (2, 4) at z = 2.
    for w in path.windows(2) {
        let (a, b) = (w[0], w[1]);
        let crosses = a.x.min(b.x) <= 0.0 && a.x.max(b.x) >= 0.0 && a.x != b.x;
        if !crosses {
            continue;
        }
        let z = a.z + (0.0 - a.x) / (b.x - a.x) * (b.z - a.z);
        assert!((z - 2.0).abs() < 1e-4, "segment {a} -> {b} crosses column 2 at z = {z}");
    }
}

#[test]
fn smooth_path_wraps_the_waypoints() {
    let pathfinder = uniform_grid(5, 0);
    let start = pathfinder.grid().cell_center(0, 0);
    let goal = pathfinder.grid().cell_center(4, 0);

    let smooth = pathfinder.find_smooth_path(start, goal, 1.0, 2.0).unwrap();
    assert_eq!(smooth.look_points(), &[start, goal]);
    assert_eq!(smooth.turn_boundaries().len(), 2);
    assert_eq!(smooth.finish_line_index(), 1);
}

#[test]
fn exported_grid_searches_the_same() {
    let mut pathfinder = uniform_grid(6, 0);
    for y in 0..5 {
        block(&mut pathfinder, 3, y);
    }
    let start = pathfinder.grid().cell_center(0, 0);
    let goal = pathfinder.grid().cell_center(5, 0);
    let before = pathfinder.find_path(start, goal).unwrap();
    assert!(!before.is_empty());

    let restored = import_grid(&export_grid(pathfinder.grid())).unwrap();
    assert_eq!(&restored, pathfinder.grid());

    let mut other = GridPathfinder::default();
    other.replace_grid(restored);
    assert_eq!(other.find_path(start, goal).unwrap(), before);
}

#[test]
fn blur_spreads_a_penalty_spike() {
    let mut pathfinder = uniform_grid(5, 0);
    let center = pathfinder.grid().cell_center(2, 2);
    pathfinder
        .add_grid_point((2, 2), PathPoint::new(center, true, 90))
        .unwrap();

    let (min, max) = pathfinder.blur_weights(1);
    assert_eq!((min, max), (0, 10));
    assert_eq!(pathfinder.grid_point(1, 1).unwrap().penalty, 10);
    assert_eq!(pathfinder.grid_point(0, 0).unwrap().penalty, 0);
}
