use glam::Vec3;
use terrain_nav::export::pack_triangles;
use terrain_nav::geometry::{is_point_in_polygon, polygon_area, Triangle};
use terrain_nav::pathfinding::world::NavMeshWorld;
use terrain_nav::{NavConfig, NavError};

fn rect(min_x: f32, min_z: f32, max_x: f32, max_z: f32) -> Vec<Vec3> {
    vec![
        Vec3::new(min_x, 0.0, min_z),
        Vec3::new(max_x, 0.0, min_z),
        Vec3::new(max_x, 0.0, max_z),
        Vec3::new(min_x, 0.0, max_z),
    ]
}

fn two_squares() -> NavMeshWorld {
    let mut world = NavMeshWorld::new(NavConfig::default());
    world.start_mesh(rect(0.0, 0.0, 10.0, 10.0));
    assert_eq!(world.end_mesh().unwrap(), 0);
    world.start_mesh(rect(10.0, 0.0, 20.0, 10.0));
    assert_eq!(world.end_mesh().unwrap(), 1);
    world
}

#[test]
fn adjacent_meshes_give_a_continuous_path() {
    let world = two_squares();
    let start = Vec3::new(2.0, 0.0, 5.0);
    let end = Vec3::new(18.0, 0.0, 5.0);

    let path = world.get_path(start, end).unwrap();
    let first = world.mesh(0).unwrap();
    let second = world.mesh(1).unwrap();
    assert_eq!(path.first().copied(), Some(first.closest_point(start).unwrap()));
    assert_eq!(path.last().copied(), Some(second.closest_point(end).unwrap()));

    // The legs meet on the shared edge, at the midpoint nearest the next centroid.
    let seam = Vec3::new(10.0, 0.0, 5.0);
    let crossing = path.iter().position(|&p| p == seam).expect("path crosses the shared edge");
    assert!(path[..crossing].iter().all(|&p| first.has_point(p)));
    assert!(path[crossing..].iter().all(|&p| second.has_point(p)));
    assert!(path.windows(2).all(|w| w[0] != w[1]));
}

#[test]
fn path_inside_one_mesh_stays_there() {
    let world = two_squares();
    let path = world
        .get_path(Vec3::new(11.0, 0.0, 1.0), Vec3::new(19.0, 0.0, 9.0))
        .unwrap();
    let second = world.mesh(1).unwrap();
    assert!(path.len() >= 2);
    assert!(path.iter().all(|&p| second.has_point(p)));
}

#[test]
fn hole_is_carved_out_of_the_mesh() {
    let mut world = NavMeshWorld::default();
    world.start_mesh(rect(0.0, 0.0, 20.0, 20.0));
    world.clip_hole(&rect(8.0, 8.0, 12.0, 12.0)).unwrap();
    world.end_mesh().unwrap();

    let triangles = world.debug_triangles(0).unwrap();
    let area: f32 = triangles.iter().map(Triangle::area).sum();
    assert!((area - 384.0).abs() < 1e-3);

    let hole = rect(8.0, 8.0, 12.0, 12.0);
    for triangle in triangles {
        assert!(!is_point_in_polygon(&hole, triangle.centroid()));
    }

    let packed = pack_triangles(world.debug_triangles(0));
    assert_eq!(packed[0] as usize, packed.len());
    assert_eq!(packed.len(), triangles.len() * 9 + 1);
}

#[test]
fn round_hole_keeps_the_outer_ring_outside() {
    let hole: Vec<Vec3> = (0..32)
        .map(|k| {
            let angle = k as f32 * std::f32::consts::TAU / 32.0;
            Vec3::new(10.0 + 3.0 * angle.cos(), 0.0, 10.0 + 3.0 * angle.sin())
        })
        .collect();
    let mut world = NavMeshWorld::default();
    world.start_mesh(rect(0.0, 0.0, 20.0, 20.0));
    world.clip_hole(&hole).unwrap();
    world.end_mesh().unwrap();

    let triangles = world.debug_triangles(0).unwrap();
    let area: f32 = triangles.iter().map(Triangle::area).sum();
    assert!((area - (400.0 - polygon_area(&hole))).abs() < 1e-2);
    for triangle in triangles {
        assert!(!is_point_in_polygon(&hole, triangle.centroid()));
    }
}

#[test]
fn clipped_edge_shrinks_the_walkable_area() {
    let mut world = NavMeshWorld::default();
    world.start_mesh(rect(0.0, 0.0, 10.0, 10.0));
    assert!(world.clip_edge(&rect(5.0, -5.0, 15.0, 5.0)).unwrap());
    world.end_mesh().unwrap();

    let mesh = world.mesh(0).unwrap();
    assert!((polygon_area(mesh.edge_vertices()) - 25.0).abs() < 1e-4);
    assert!(world.get_path(Vec3::new(1.0, 0.0, 9.0), Vec3::new(9.0, 0.0, 1.0)).unwrap().is_empty());
    let path = world.get_path(Vec3::new(6.0, 0.0, 1.0), Vec3::new(9.0, 0.0, 4.0)).unwrap();
    assert!(!path.is_empty());
}

#[test]
fn degenerate_boundary_is_reported() {
    let mut world = NavMeshWorld::default();
    world.start_mesh(vec![Vec3::ZERO, Vec3::X]);
    assert!(matches!(world.end_mesh(), Err(NavError::DegeneratePolygon(2))));
    assert!(world.is_empty());
}
