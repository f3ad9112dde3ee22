pub mod astar;
pub mod graph;
pub mod grid;
pub mod heap;
pub mod kdtree;
pub mod navmesh;
pub mod smooth;
pub mod world;
