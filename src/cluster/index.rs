//! Hierarchical cluster index
//!
//! Points are clustered bottom-up, one K-D tree per zoom level from
//! `max_zoom + 1` (every point on its own) down to `min_zoom`. At each level
//! an unvisited entity absorbs every unvisited neighbour within `radius`
//! pixels, provided the merged group reaches `min_points`. Queries pick the
//! tree for the requested zoom and run a box search on it, so panning never
//! rebuilds anything.
//!
//! Cluster ids encode the position of the entity the cluster grew from:
//! `(origin_index << 5) + (zoom + 1) + total_points`. The offset keeps them
//! apart from plain point indices and lets `get_children` find the level
//! below without any lookup table.

use std::sync::Arc;

use tracing::debug;

use super::entity::{Cluster, ClusterEntity, ClusterId};
use super::kdtree::{KDTree, new_kd_tree};
use super::mercator::{lat_y, lng_x, world_size};
use super::options::ClusterOptions;
use crate::error::{ClusterError, OptionsError};
use crate::geometry::{BoundingBox, FeaturePoint, GeoPoint};

/// Zoom marker of an entity no level has processed yet
const NOT_VISITED: u8 = u8::MAX;

#[derive(Debug, Clone, Copy, PartialEq)]
enum NodeKind {
    Leaf(usize),
    Cluster(ClusterId),
}

#[derive(Debug, Clone)]
struct Node {
    /// Projected position
    x: f64,
    y: f64,
    /// Mean member coordinate
    lng: f64,
    lat: f64,
    /// Last zoom level that processed this node
    zoom: u8,
    kind: NodeKind,
    parent: Option<ClusterId>,
    num_points: usize,
    bounds: BoundingBox,
}

impl Node {
    fn leaf(index: usize, pt: &GeoPoint) -> Self {
        Self {
            x: lng_x(pt.longitude),
            y: lat_y(pt.latitude),
            lng: pt.longitude,
            lat: pt.latitude,
            zoom: NOT_VISITED,
            kind: NodeKind::Leaf(index),
            parent: None,
            num_points: 1,
            bounds: BoundingBox::new(pt.longitude, pt.latitude, pt.longitude, pt.latitude),
        }
    }

    fn cluster(id: ClusterId, lng: f64, lat: f64, num_points: usize, bounds: BoundingBox) -> Self {
        Self {
            x: lng_x(lng),
            y: lat_y(lat),
            lng,
            lat,
            zoom: NOT_VISITED,
            kind: NodeKind::Cluster(id),
            parent: None,
            num_points,
            bounds,
        }
    }

    /// Copy carried unchanged into the next coarser level
    fn carried(&self) -> Self {
        Self {
            parent: None,
            ..self.clone()
        }
    }
}

/// Entities of one zoom level and the tree over their positions
#[derive(Debug)]
struct Level {
    tree: KDTree,
    nodes: Vec<Node>,
}

impl Level {
    fn new(nodes: Vec<Node>) -> Self {
        let tree = new_kd_tree(nodes.iter().map(|n| [n.x, n.y]).collect());
        Self { tree, nodes }
    }
}

/// Immutable cluster index over a point set
///
/// Built once per data batch. All queries take `&self`, so one index can be
/// shared between threads; a rebuild yields a new index.
#[derive(Debug)]
pub struct ClusterIndex<P> {
    options: ClusterOptions,
    points: Arc<[FeaturePoint<P>]>,
    /// `levels[k]` holds zoom `min_zoom + k`, the last one is `max_zoom + 1`
    levels: Vec<Level>,
}

impl<P: Clone> ClusterIndex<P> {
    /// Builds the index for all zoom levels
    pub fn build(
        points: impl Into<Arc<[FeaturePoint<P>]>>,
        options: ClusterOptions,
    ) -> Result<Self, OptionsError> {
        options.validate()?;
        let points = points.into();

        let leaves: Vec<Node> = points
            .iter()
            .enumerate()
            .map(|(i, p)| Node::leaf(i, &p.geometry))
            .collect();

        let mut levels = Vec::with_capacity((options.max_zoom - options.min_zoom) as usize + 2);
        let mut current = Level::new(leaves);
        for zoom in (options.min_zoom..=options.max_zoom).rev() {
            let next = cluster_level(&mut current, zoom, &options, points.len());
            debug!(zoom, entities = next.len(), "built cluster level");
            levels.push(current);
            current = Level::new(next);
        }
        levels.push(current);
        levels.reverse();

        Ok(Self {
            options,
            points,
            levels,
        })
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    pub fn points(&self) -> &[FeaturePoint<P>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns clusters and points of the given zoom inside the box
    ///
    /// Zooms outside the built range use the nearest level. Results come in
    /// index order, which is stable for a fixed box and zoom.
    pub fn get_clusters(&self, bbox: &BoundingBox, zoom: u8) -> Vec<ClusterEntity<P>> {
        let mut min_lng = (bbox.west + 180.0).rem_euclid(360.0) - 180.0;
        let min_lat = bbox.south.clamp(-90.0, 90.0);
        let mut max_lng = if bbox.east == 180.0 {
            180.0
        } else {
            (bbox.east + 180.0).rem_euclid(360.0) - 180.0
        };
        let max_lat = bbox.north.clamp(-90.0, 90.0);

        if bbox.east - bbox.west >= 360.0 {
            min_lng = -180.0;
            max_lng = 180.0;
        } else if min_lng > max_lng {
            // crosses the antimeridian
            let mut eastern =
                self.get_clusters(&BoundingBox::new(min_lng, min_lat, 180.0, max_lat), zoom);
            let western =
                self.get_clusters(&BoundingBox::new(-180.0, min_lat, max_lng, max_lat), zoom);
            eastern.extend(western);
            return eastern;
        }

        let level = self.level_for_zoom(zoom);
        let mut ids = level.tree.range(
            &[lng_x(min_lng), lat_y(max_lat)],
            &[lng_x(max_lng), lat_y(min_lat)],
        );
        ids.sort_unstable();
        ids.into_iter()
            .map(|i| self.entity(&level.nodes[i]))
            .collect()
    }

    /// Returns the entities one zoom level below a cluster
    pub fn get_children(
        &self,
        cluster_id: ClusterId,
    ) -> Result<Vec<ClusterEntity<P>>, ClusterError> {
        Ok(self
            .child_nodes(cluster_id)?
            .into_iter()
            .map(|n| self.entity(n))
            .collect())
    }

    /// Returns up to `limit` original points of a cluster in input order, skipping `offset`
    pub fn get_leaves(
        &self,
        cluster_id: ClusterId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<FeaturePoint<P>>, ClusterError> {
        let mut leaves = Vec::new();
        self.collect_leaves(cluster_id, &mut leaves)?;
        leaves.sort_unstable();
        Ok(leaves
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|i| self.points[i].clone())
            .collect())
    }

    /// Returns the zoom at which a cluster breaks into several entities
    pub fn get_expansion_zoom(&self, cluster_id: ClusterId) -> Result<u8, ClusterError> {
        let (_, origin_zoom) = self.decode_id(cluster_id)?;
        let mut expansion = origin_zoom - 1;
        let mut current = cluster_id;

        while expansion <= self.options.max_zoom {
            let children = self.child_nodes(current)?;
            expansion += 1;
            match children.as_slice() {
                [only] => match only.kind {
                    NodeKind::Cluster(id) => current = id,
                    NodeKind::Leaf(_) => break,
                },
                _ => break,
            }
        }

        Ok(expansion)
    }

    /// Checks that `cluster` is the one its id names in this index
    ///
    /// Ids are positional, so after a rebuild an old id can name a different
    /// group. The members and their bounds have to match as well.
    pub fn verify_cluster(&self, cluster: &Cluster) -> Result<(), ClusterError> {
        let mut leaves = Vec::with_capacity(cluster.point_count);
        self.collect_leaves(cluster.id, &mut leaves)?;
        leaves.sort_unstable();

        let same_members = leaves.len() == cluster.point_count
            && leaves.len() == cluster.member_ids.len()
            && leaves
                .iter()
                .zip(&cluster.member_ids)
                .all(|(&i, id)| self.points[i].id == *id);
        let bounds = BoundingBox::around(leaves.iter().map(|&i| &self.points[i].geometry));

        if same_members && bounds == Some(cluster.bounds) {
            Ok(())
        } else {
            Err(ClusterError::ClusterNotFound(cluster.id))
        }
    }

    fn level_for_zoom(&self, zoom: u8) -> &Level {
        let zoom = zoom.clamp(self.options.min_zoom, self.options.max_zoom + 1);
        &self.levels[(zoom - self.options.min_zoom) as usize]
    }

    /// Splits a cluster id into origin index and origin zoom
    fn decode_id(&self, cluster_id: ClusterId) -> Result<(usize, u8), ClusterError> {
        let raw = cluster_id
            .0
            .checked_sub(self.points.len() as u64)
            .ok_or(ClusterError::ClusterNotFound(cluster_id))?;
        let origin_zoom = (raw % 32) as u8;
        let origin_index = (raw >> 5) as usize;

        if origin_zoom <= self.options.min_zoom || origin_zoom > self.options.max_zoom + 1 {
            return Err(ClusterError::ClusterNotFound(cluster_id));
        }
        Ok((origin_index, origin_zoom))
    }

    fn child_nodes(&self, cluster_id: ClusterId) -> Result<Vec<&Node>, ClusterError> {
        let (origin_index, origin_zoom) = self.decode_id(cluster_id)?;
        let not_found = || ClusterError::ClusterNotFound(cluster_id);

        let level = &self.levels[(origin_zoom - self.options.min_zoom) as usize];
        let origin = level.nodes.get(origin_index).ok_or_else(not_found)?;

        let r = self.options.radius as f64 / world_size(self.options.extent, origin_zoom - 1);
        let children: Vec<&Node> = level
            .tree
            .within(&[origin.x, origin.y], r, Vec::new())
            .into_iter()
            .map(|i| &level.nodes[i])
            .filter(|n| n.parent == Some(cluster_id))
            .collect();

        if children.is_empty() {
            return Err(not_found());
        }
        Ok(children)
    }

    fn collect_leaves(
        &self,
        cluster_id: ClusterId,
        out: &mut Vec<usize>,
    ) -> Result<(), ClusterError> {
        for child in self.child_nodes(cluster_id)? {
            match child.kind {
                NodeKind::Leaf(i) => out.push(i),
                NodeKind::Cluster(id) => self.collect_leaves(id, out)?,
            }
        }
        Ok(())
    }

    fn entity(&self, node: &Node) -> ClusterEntity<P> {
        match node.kind {
            NodeKind::Leaf(i) => ClusterEntity::Point(self.points[i].clone()),
            NodeKind::Cluster(id) => {
                let mut leaves = Vec::with_capacity(node.num_points);
                if let Err(e) = self.collect_leaves(id, &mut leaves) {
                    debug!(error = %e, "cluster without children");
                }
                leaves.sort_unstable();
                ClusterEntity::Cluster(Cluster {
                    id,
                    coordinate: GeoPoint::new(node.lng, node.lat),
                    point_count: node.num_points,
                    member_ids: leaves.into_iter().map(|i| self.points[i].id.clone()).collect(),
                    bounds: node.bounds,
                })
            }
        }
    }
}

/// Clusters the entities of one level into the next coarser one
fn cluster_level(
    level: &mut Level,
    zoom: u8,
    options: &ClusterOptions,
    total_points: usize,
) -> Vec<Node> {
    let r = options.radius as f64 / world_size(options.extent, zoom);
    let Level { tree, nodes } = level;
    let mut next = Vec::new();
    let mut neighbors = Vec::new();

    for i in 0..nodes.len() {
        if nodes[i].zoom <= zoom {
            continue;
        }
        nodes[i].zoom = zoom;

        neighbors.clear();
        neighbors = tree.within(&[nodes[i].x, nodes[i].y], r, neighbors);

        let origin_points = nodes[i].num_points;
        let mut num_points = origin_points;
        for &j in &neighbors {
            if nodes[j].zoom > zoom {
                num_points += nodes[j].num_points;
            }
        }

        if num_points > origin_points && num_points >= options.min_points {
            let id = ClusterId(((i as u64) << 5) + (zoom as u64 + 1) + total_points as u64);
            let mut sum_lng = nodes[i].lng * origin_points as f64;
            let mut sum_lat = nodes[i].lat * origin_points as f64;
            let mut bounds = nodes[i].bounds;

            for &j in &neighbors {
                let b = &mut nodes[j];
                if b.zoom <= zoom {
                    continue;
                }
                b.zoom = zoom;
                b.parent = Some(id);
                sum_lng += b.lng * b.num_points as f64;
                sum_lat += b.lat * b.num_points as f64;
                bounds.union(&b.bounds);
            }
            nodes[i].parent = Some(id);

            let n = num_points as f64;
            next.push(Node::cluster(id, sum_lng / n, sum_lat / n, num_points, bounds));
        } else {
            next.push(nodes[i].carried());
            if num_points > 1 {
                // too few to cluster: neighbours stay separate at this zoom
                for &j in &neighbors {
                    if nodes[j].zoom > zoom {
                        nodes[j].zoom = zoom;
                        next.push(nodes[j].carried());
                    }
                }
            }
        }
    }

    next
}
