//! Point-geometry decoding and viewport-driven marker clustering
//!
//! Records arrive with hex-encoded point geometries, are decoded into
//! `FeaturePoint`s and grouped into clusters that fit the current map view.
//! Two strategies are available: a zoom-level index built once per data
//! batch, and a greedy distance clusterer for small point sets.

pub mod cluster;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod viewport;

pub use cluster::{
    Cluster, ClusterEntity, ClusterId, ClusterIndex, ClusterOptions, ClusterStrategy,
    DistanceClusterer,
};
pub use engine::{ClusteringEngine, EngineConfig, MapListener, StrategyChoice};
pub use error::{ClusterError, DecodeError, Error, OptionsError, Result};
pub use geometry::{
    BoundingBox, FeaturePoint, GeoPoint, RawRecord, decode, decode_batch, decode_hex,
    distance_meters,
};
pub use viewport::{Viewport, get_bounds_for_cluster_expansion};
