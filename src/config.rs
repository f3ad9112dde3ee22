use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for the A* searches and path smoothing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Expansions allowed before a search gives up and reports no path.
    pub max_iterations: usize,
    /// KD-tree neighbors are the points within twice this radius.
    pub node_radius: f32,
    /// How far before a look point the smoothed path starts turning.
    pub turn_distance: f32,
    /// Remaining distance at which a follower starts slowing down.
    pub stopping_distance: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            node_radius: 0.5,
            turn_distance: 1.0,
            stopping_distance: 2.0,
        }
    }
}

impl SearchConfig {
    /// Smoothing distances, with the configured ones standing in for any
    /// the caller leaves out.
    pub fn smoothing(
        &self,
        turn_distance: Option<f32>,
        stopping_distance: Option<f32>,
    ) -> (f32, f32) {
        (
            turn_distance.unwrap_or(self.turn_distance),
            stopping_distance.unwrap_or(self.stopping_distance),
        )
    }
}

/// Tunables for navmesh construction.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MeshConfig {
    /// Triangles larger than this (XZ area) also contribute their centroid
    /// to the mesh graph.
    pub triangle_area_threshold: f32,
    /// Consecutive boundary vertices closer than this are merged before a
    /// hole is cut.
    pub vertex_merge_threshold: f32,
    /// Distance from a boundary segment still counted as "on the edge".
    pub edge_tolerance: f32,
    pub max_clip_steps: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            triangle_area_threshold: 10.0,
            vertex_merge_threshold: 0.8,
            edge_tolerance: 1e-3,
            max_clip_steps: 10_000,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct NavConfig {
    pub search: SearchConfig,
    pub mesh: MeshConfig,
}

impl NavConfig {
    /// Parses a (possibly partial) JSON document; missing fields keep their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = NavConfig::from_json(r#"{ "search": { "node_radius": 2.0 } }"#)
            .expect("valid config");
        assert_eq!(config.search.node_radius, 2.0);
        assert_eq!(config.search.max_iterations, 10_000);
        assert_eq!(config.mesh, MeshConfig::default());
    }

    #[test]
    fn smoothing_falls_back_to_configured_distances() {
        let config = NavConfig::from_json(r#"{ "search": { "turn_distance": 3.0 } }"#)
            .expect("valid config")
            .search;
        assert_eq!(config.smoothing(None, None), (3.0, 2.0));
        assert_eq!(config.smoothing(Some(0.5), None), (0.5, 2.0));
        assert_eq!(config.smoothing(None, Some(7.0)), (3.0, 7.0));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = NavConfig::from_json("{ nope").unwrap_err();
        assert!(matches!(err, crate::error::NavError::Config(_)));
    }
}
