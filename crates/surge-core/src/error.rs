use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SurgeError>;

#[derive(Debug, Error)]
pub enum SurgeError {
    /// A per-location array or matrix does not line up with the location list.
    #[error("{what}: expected length {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Stored-entry layout of a sparse matrix is inconsistent.
    #[error("malformed sparse matrix: {0}")]
    MalformedMatrix(&'static str),

    #[error("hazard has no locations")]
    NoLocations,

    #[error("degenerate bounding box: lon [{min_lon}, {max_lon}], lat [{min_lat}, {max_lat}]")]
    DegenerateBounds {
        min_lon: f64,
        max_lon: f64,
        min_lat: f64,
        max_lat: f64,
    },

    /// The elevation provider returned nothing usable for the request.
    #[error("elevation source returned no data: {0}")]
    ElevationUnavailable(String),

    #[error("hazard has no elevation attached")]
    MissingElevation,

    #[error("hazard peril is already '{0}'; surge conversion applies to wind footprints only")]
    AlreadyConverted(String),

    #[error("regridder returned {actual} sample assignments for {expected} samples")]
    RegridMismatch { expected: usize, actual: usize },

    #[error("no landfall samples in any category; decay parameters cannot be fitted")]
    NoDecaySamples,

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
