//! Clustering of feature points into zoom-appropriate map entities
pub mod distance_clusterer;
pub mod entity;
pub mod index;
pub mod kdtree;
pub mod mercator;
pub mod options;
pub mod strategy;

#[cfg(test)]
mod distance_clusterer_test;

pub use distance_clusterer::{DistanceClusterer, cluster_id, threshold_meters};
pub use entity::{Cluster, ClusterEntity, ClusterId, cap_entities};
pub use index::ClusterIndex;
pub use kdtree::{KDTree, new_kd_tree};
pub use options::{ClusterOptions, MAX_SUPPORTED_ZOOM};
pub use strategy::ClusterStrategy;
