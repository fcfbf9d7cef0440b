use super::distance_clusterer::DistanceClusterer;
use super::entity::{Cluster, ClusterEntity};
use super::index::ClusterIndex;
use crate::error::ClusterError;
use crate::viewport::Viewport;

/// A way of turning the current point set into map entities for a view
///
/// Implementations are immutable once built and may be queried from any
/// thread. Different strategies may group the same input differently.
pub trait ClusterStrategy<P>: Send + Sync {
    /// Entities visible in the viewport
    fn clusters(&self, viewport: &Viewport) -> Vec<ClusterEntity<P>>;

    /// Zoom at which the cluster splits into several entities
    fn expansion_zoom(&self, cluster: &Cluster, viewport: &Viewport) -> Result<u8, ClusterError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

impl<P: Clone + Send + Sync> ClusterStrategy<P> for ClusterIndex<P> {
    fn clusters(&self, viewport: &Viewport) -> Vec<ClusterEntity<P>> {
        self.get_clusters(&viewport.bounding_box(), viewport.zoom())
    }

    fn expansion_zoom(&self, cluster: &Cluster, _viewport: &Viewport) -> Result<u8, ClusterError> {
        self.verify_cluster(cluster)?;
        self.get_expansion_zoom(cluster.id)
    }

    fn name(&self) -> &'static str {
        "hierarchical"
    }
}

impl<P: Clone + Send + Sync> ClusterStrategy<P> for DistanceClusterer<P> {
    fn clusters(&self, viewport: &Viewport) -> Vec<ClusterEntity<P>> {
        let bbox = viewport.bounding_box();
        self.cluster(viewport.latitude_delta)
            .into_iter()
            .filter(|e| bbox.contains(&e.coordinate()))
            .collect()
    }

    fn expansion_zoom(&self, cluster: &Cluster, viewport: &Viewport) -> Result<u8, ClusterError> {
        DistanceClusterer::expansion_zoom(self, cluster, viewport)
    }

    fn name(&self) -> &'static str {
        "distance"
    }
}
