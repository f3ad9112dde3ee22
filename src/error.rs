use thiserror::Error;

/// Failures surfaced by the spatial indices, the geometry pipeline and the
/// flat-buffer codecs.
///
/// An unreachable target is not an error: searches return an empty path.
#[derive(Error, Debug)]
pub enum NavError {
    #[error("spatial index is empty")]
    EmptyIndex,
    #[error("grid index ({x}, {y}) is out of bounds for a {width}x{height} grid")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error("polygon needs at least 3 vertices, got {0}")]
    DegeneratePolygon(usize),
    #[error("triangulation ran out of ears with {remaining} vertices left")]
    EarsExhausted { remaining: usize },
    #[error("polygon clipping did not close a loop within {0} steps")]
    ClipDiverged(usize),
    #[error("hole could not be bridged to the outer boundary")]
    HoleNotBridged,
    #[error("navmesh is already triangulated")]
    MeshFinalized,
    #[error("navmesh has not been triangulated")]
    MeshNotFinalized,
    #[error("no navmesh is being built")]
    NoMeshInProgress,
    #[error("malformed buffer: {0}")]
    MalformedBuffer(String),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NavError>;
