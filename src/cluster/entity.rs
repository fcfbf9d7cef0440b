use std::fmt;

use crate::geometry::{BoundingBox, FeaturePoint, GeoPoint};

/// Identifier of a cluster, valid against the index (or clusterer) that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterId(pub u64);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cluster represents several nearby points rendered as one marker
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub id: ClusterId,
    /// Mean of the member coordinates
    pub coordinate: GeoPoint,
    pub point_count: usize,
    /// Member ids in input order
    pub member_ids: Vec<String>,
    /// Bounds of the member coordinates
    pub bounds: BoundingBox,
}

/// A render-ready map entity
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterEntity<P> {
    Point(FeaturePoint<P>),
    Cluster(Cluster),
}

impl<P> ClusterEntity<P> {
    /// Number of source points the entity stands for
    pub fn point_count(&self) -> usize {
        match self {
            ClusterEntity::Point(_) => 1,
            ClusterEntity::Cluster(c) => c.point_count,
        }
    }

    pub fn coordinate(&self) -> GeoPoint {
        match self {
            ClusterEntity::Point(p) => p.geometry,
            ClusterEntity::Cluster(c) => c.coordinate,
        }
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self, ClusterEntity::Cluster(_))
    }

    pub fn as_cluster(&self) -> Option<&Cluster> {
        match self {
            ClusterEntity::Cluster(c) => Some(c),
            ClusterEntity::Point(_) => None,
        }
    }
}

/// Caps an entity list at `max` entries
///
/// Over the cap, clusters are kept ahead of points and larger clusters ahead
/// of smaller ones; equal entries keep their relative order.
pub fn cap_entities<P>(entities: &mut Vec<ClusterEntity<P>>, max: usize) {
    if entities.len() <= max {
        return;
    }
    entities.sort_by_key(|e| (!e.is_cluster(), std::cmp::Reverse(e.point_count())));
    entities.truncate(max);
}
