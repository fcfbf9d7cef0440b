use crate::cluster::{Cluster, ClusterEntity};
use crate::geometry::FeaturePoint;
use crate::viewport::Viewport;

/// Receives what the engine hands to the map renderer
///
/// All methods default to doing nothing.
pub trait MapListener<P> {
    /// A new entity list was published
    fn on_entities(&mut self, _entities: &[ClusterEntity<P>]) {}

    fn on_marker_press(&mut self, _point: &FeaturePoint<P>) {}

    /// A cluster was tapped; `target` is where the camera should go
    fn on_cluster_press(&mut self, _cluster: &Cluster, _target: &Viewport) {}
}

/// Listener that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl<P> MapListener<P> for NoopListener {}
