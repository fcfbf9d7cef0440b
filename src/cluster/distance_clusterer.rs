//! Greedy distance-threshold clustering
//!
//! A single pass over the input in order: every unprocessed point gathers
//! the unprocessed points within the zoom-derived threshold and becomes
//! either a cluster at the group's mean coordinate or, when it has fewer
//! than `min_points` members, individual points. A candidate joins a group
//! only if it is within the threshold of every member already in it. O(n²)
//! in the worst case, meant for small sets.

use std::collections::HashMap;

use bitvec::prelude::*;

use super::entity::{Cluster, ClusterEntity, ClusterId};
use super::options::MAX_SUPPORTED_ZOOM;
use crate::error::ClusterError;
use crate::geometry::{
    FeaturePoint, GeoPoint, centroid_and_bounds, distance_meters, max_pairwise_distance,
};
use crate::viewport::{Viewport, get_bounds_for_cluster_expansion};

/// Threshold of the finest tier, where only co-located points may group
const CO_LOCATION_THRESHOLD_METERS: f64 = 1.0;

/// Maximum spread of a co-located group
const CO_LOCATION_MAX_SPREAD_METERS: f64 = 1.0;

const DEFAULT_MIN_POINTS: usize = 2;

/// Clustering distance for a view's latitude span
///
/// Monotonic step function: wide spans cluster coarsely, spans at or below
/// 0.003° only merge points a meter apart.
pub fn threshold_meters(latitude_delta: f64) -> f64 {
    match latitude_delta {
        d if d >= 0.2 => 3000.0,
        d if d >= 0.1 => 1500.0,
        d if d >= 0.05 => 700.0,
        d if d >= 0.02 => 300.0,
        d if d >= 0.01 => 120.0,
        d if d >= 0.005 => 40.0,
        d if d > 0.003 => 10.0,
        _ => 1.0,
    }
}

/// Greedy clusterer over an owned point set
#[derive(Debug, Clone)]
pub struct DistanceClusterer<P> {
    points: Vec<FeaturePoint<P>>,
    by_id: HashMap<String, usize>,
    min_points: usize,
}

impl<P: Clone> DistanceClusterer<P> {
    pub fn new(points: impl IntoIterator<Item = FeaturePoint<P>>) -> Self {
        let points: Vec<FeaturePoint<P>> = points.into_iter().collect();
        let by_id = points
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        Self {
            points,
            by_id,
            min_points: DEFAULT_MIN_POINTS,
        }
    }

    /// Groups smaller than `min_points` come out as individual points
    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points.max(DEFAULT_MIN_POINTS);
        self
    }

    pub fn min_points(&self) -> usize {
        self.min_points
    }

    pub fn points(&self) -> &[FeaturePoint<P>] {
        &self.points
    }

    /// Clusters the points for a view's latitude span
    pub fn cluster(&self, latitude_delta: f64) -> Vec<ClusterEntity<P>> {
        let threshold = threshold_meters(latitude_delta);
        let mut processed = bitvec![0; self.points.len()];
        let mut entities = Vec::new();

        for i in 0..self.points.len() {
            if processed[i] {
                continue;
            }
            processed.set(i, true);

            let mut group = vec![i];
            for j in i + 1..self.points.len() {
                if processed[j] {
                    continue;
                }
                let candidate = &self.points[j].geometry;
                if group
                    .iter()
                    .all(|&k| distance_meters(&self.points[k].geometry, candidate) <= threshold)
                {
                    group.push(j);
                    processed.set(j, true);
                }
            }

            let too_small = group.len() < self.min_points;
            // visibly separate pins at full zoom stay separate
            let spread_out = threshold <= CO_LOCATION_THRESHOLD_METERS
                && self.spread(&group) > CO_LOCATION_MAX_SPREAD_METERS;
            if too_small || spread_out {
                entities.extend(
                    group
                        .iter()
                        .map(|&k| ClusterEntity::Point(self.points[k].clone())),
                );
                continue;
            }

            if let Some(cluster) = self.make_cluster(&group) {
                entities.push(ClusterEntity::Cluster(cluster));
            }
        }

        entities
    }

    /// Zoom at which a cluster produced by `cluster` splits up
    ///
    /// Walks zoom levels above the view's and checks the threshold of the
    /// camera target each level would produce. The first level whose
    /// threshold no longer holds the members together wins. Coincident
    /// members never split and yield the highest zoom.
    pub fn expansion_zoom(
        &self,
        cluster: &Cluster,
        viewport: &Viewport,
    ) -> Result<u8, ClusterError> {
        let members: Vec<GeoPoint> = cluster
            .member_ids
            .iter()
            .map(|id| self.by_id.get(id).map(|&i| self.points[i].geometry))
            .collect::<Option<_>>()
            .ok_or(ClusterError::ClusterNotFound(cluster.id))?;
        if members.len() < self.min_points || cluster_id(&cluster.member_ids) != cluster.id {
            return Err(ClusterError::ClusterNotFound(cluster.id));
        }

        let spread = max_pairwise_distance(&members);
        let current = viewport.zoom();
        for zoom in current.saturating_add(1)..=MAX_SUPPORTED_ZOOM {
            let target = get_bounds_for_cluster_expansion(cluster, zoom, viewport);
            let threshold = threshold_meters(target.latitude_delta);
            let splits = spread > threshold
                || (threshold <= CO_LOCATION_THRESHOLD_METERS
                    && spread > CO_LOCATION_MAX_SPREAD_METERS);
            if splits {
                return Ok(zoom);
            }
        }
        Ok(MAX_SUPPORTED_ZOOM)
    }

    fn spread(&self, group: &[usize]) -> f64 {
        let coords: Vec<GeoPoint> = group.iter().map(|&k| self.points[k].geometry).collect();
        max_pairwise_distance(&coords)
    }

    fn make_cluster(&self, group: &[usize]) -> Option<Cluster> {
        let coords: Vec<GeoPoint> = group.iter().map(|&k| self.points[k].geometry).collect();
        let (coordinate, bounds) = centroid_and_bounds(&coords)?;
        let member_ids: Vec<String> = group.iter().map(|&k| self.points[k].id.clone()).collect();
        Some(Cluster {
            id: cluster_id(&member_ids),
            coordinate,
            point_count: group.len(),
            member_ids,
            bounds,
        })
    }
}

/// Stable id derived from the member ids
///
/// FNV-1a over the ids with a separator byte, so the same members always
/// give the same id across passes.
pub fn cluster_id(member_ids: &[String]) -> ClusterId {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for id in member_ids {
        for &b in id.as_bytes().iter().chain(std::iter::once(&0xffu8)) {
            hash ^= b as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    ClusterId(hash)
}
