//! Error taxonomy of the clustering engine

use std::path::PathBuf;

use crate::cluster::ClusterId;

/// Failure to turn geometry bytes into a coordinate
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// Byte layout does not match the declared fields (short, trailing bytes, bad hex)
    #[error("malformed geometry input: {0}")]
    MalformedInput(String),

    /// Geometry type code is not a plain 2-D point
    #[error("unsupported geometry type code {0:#010x}")]
    UnsupportedGeometryType(u32),

    /// Decoded value is NaN, infinite or outside the lon/lat range
    #[error("invalid coordinate (longitude {longitude}, latitude {latitude})")]
    InvalidCoordinate { longitude: f64, latitude: f64 },
}

/// Lookups against a built (or not yet built) cluster index
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClusterError {
    #[error("no cluster with id {0}")]
    ClusterNotFound(ClusterId),

    #[error("cluster index has not been built")]
    IndexNotBuilt,
}

/// Configuration mistakes, reported when options are set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionsError {
    #[error("invalid cluster options: {0}")]
    InvalidOptions(String),
}

/// Crate-level error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error("failed to load config {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
