//! Linker smoke tests, run with `wasm-pack test --node`.
#![cfg(target_arch = "wasm32")]

use terrain_nav::{GridLinker, KdTreeLinker, NavMeshLinker};
use wasm_bindgen_test::*;

#[wasm_bindgen_test]
fn grid_linker_round_trip() {
    let mut linker = GridLinker::new(None).unwrap();
    linker.setup(5, 5, 0, 0, 0.0, 0.0, 0.0);

    // Along the bottom row: straight steps are the only cheapest route.
    let path = linker.find_path(-2.0, 0.0, -2.0, 2.0, 0.0, -2.0, false, None, None).unwrap();
    assert_eq!(path, vec![7.0, -2.0, 0.0, -2.0, 2.0, 0.0, -2.0]);

    let smooth = linker.find_path(-2.0, 0.0, -2.0, 2.0, 0.0, -2.0, true, Some(1.0), None).unwrap();
    assert_eq!(smooth[0] as usize, smooth.len());
    assert_eq!(smooth.len(), 2 * 10 + 3);

    let len = linker.export();
    assert_eq!(len, 25 * 7 + 9);
    let snapshot = linker.get_snapshot().unwrap();
    linker.clear();
    assert_eq!(linker.export(), 0);
    linker.load_snapshot(snapshot).unwrap();
    assert_eq!(linker.export(), len);
}

#[wasm_bindgen_test]
fn grid_linker_reports_errors() {
    let linker = GridLinker::new(Some(r#"{"search": {"max_iterations": 50}}"#.into())).unwrap();
    assert!(linker.get_grid_point_at(0, 0).is_err());
    assert!(GridLinker::new(Some("{".into())).is_err());
}

#[wasm_bindgen_test]
fn kd_linker_batches() {
    let mut linker = KdTreeLinker::new(None).unwrap();
    linker.setup(0.5, 0, 0);
    let mut points = Vec::new();
    for x in 0..5 {
        points.extend_from_slice(&[x as f32, 0.0, 0.0, 1.0, 0.0]);
    }
    linker.add_points(&points, 5, 5).unwrap();

    assert_eq!(linker.get_point(3.2, 0.0, 0.0).unwrap(), vec![3.0, 0.0, 0.0, 0.0, 1.0]);
    let path = linker.find_path(0.0, 0.0, 0.0, 4.0, 0.0, 0.0, false, None, None).unwrap();
    assert_eq!(path, vec![7.0, 0.0, 0.0, 0.0, 4.0, 0.0, 0.0]);
    assert_eq!(linker.remove_points(&[1.0, 0.0, 0.0, 2.0, 0.0, 0.0], 2, 3).unwrap(), 2);
}

#[wasm_bindgen_test]
fn navmesh_linker_builds_and_paths() {
    let mut linker = NavMeshLinker::new(None).unwrap();
    linker.start_mesh(&[0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 10.0, 0.0, 10.0, 0.0, 0.0, 10.0]).unwrap();
    assert_eq!(linker.end_mesh().unwrap(), 0);

    assert_eq!(linker.get_debug_mesh(0).len(), 2 * 9 + 1);
    assert_eq!(linker.get_debug_mesh(7), vec![1.0]);

    let path = linker.get_path(0.1, 0.0, 0.1, 9.9, 0.0, 9.9).unwrap();
    assert_eq!(path[0] as usize, path.len());
    assert!(linker.end_mesh().is_err());
}
