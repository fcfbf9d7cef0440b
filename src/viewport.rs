use serde::{Deserialize, Serialize};

use crate::cluster::options::MAX_SUPPORTED_ZOOM;
use crate::cluster::Cluster;
use crate::geometry::{BoundingBox, GeoPoint};

/// Smallest span a cluster tap may zoom the camera to, in degrees
pub const MIN_EXPANSION_DELTA: f64 = 0.0005;

/// Extra room around a cluster's members when zooming onto them
const EXPANSION_PADDING: f64 = 1.2;

/// Visible map region: a center plus latitude/longitude spans in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl Viewport {
    pub fn new(
        center_latitude: f64,
        center_longitude: f64,
        latitude_delta: f64,
        longitude_delta: f64,
    ) -> Self {
        Self {
            center_latitude,
            center_longitude,
            latitude_delta,
            longitude_delta,
        }
    }

    /// Viewport around `center` showing the span of a zoom level
    ///
    /// `lat_ratio` is latitude span over longitude span of the map view.
    pub fn from_zoom(center: GeoPoint, zoom: u8, lat_ratio: f64) -> Self {
        let longitude_delta = zoom_longitude_delta(zoom);
        Self::new(
            center.latitude,
            center.longitude,
            longitude_delta * lat_ratio,
            longitude_delta,
        )
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(self.center_longitude, self.center_latitude)
    }

    /// Checks the center is a valid coordinate and both spans are positive
    pub fn is_valid(&self) -> bool {
        self.center().is_valid()
            && self.latitude_delta.is_finite()
            && self.longitude_delta.is_finite()
            && self.latitude_delta > 0.0
            && self.longitude_delta > 0.0
    }

    /// Discrete zoom level implied by the longitude span
    pub fn zoom(&self) -> u8 {
        if !(self.longitude_delta.is_finite() && self.longitude_delta > 0.0) {
            return MAX_SUPPORTED_ZOOM;
        }
        let zoom = (360.0 / self.longitude_delta).log2().round();
        zoom.clamp(0.0, MAX_SUPPORTED_ZOOM as f64) as u8
    }

    /// Visible box; `west > east` when the view crosses the antimeridian
    pub fn bounding_box(&self) -> BoundingBox {
        let half_lon = self.longitude_delta / 2.0;
        let half_lat = self.latitude_delta / 2.0;

        if self.longitude_delta >= 360.0 {
            return BoundingBox::new(
                -180.0,
                (self.center_latitude - half_lat).max(-90.0),
                180.0,
                (self.center_latitude + half_lat).min(90.0),
            );
        }

        BoundingBox::new(
            wrap_longitude(self.center_longitude - half_lon),
            (self.center_latitude - half_lat).max(-90.0),
            wrap_longitude(self.center_longitude + half_lon),
            (self.center_latitude + half_lat).min(90.0),
        )
    }
}

/// Longitude span of one screen at a zoom level
pub fn zoom_longitude_delta(zoom: u8) -> f64 {
    360.0 / 2f64.powi(zoom as i32)
}

fn wrap_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        lng
    } else {
        (lng + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Computes the camera target for a tap on a cluster
///
/// The new view is centered on the members' bounds with the span of
/// `target_zoom`, widened to fit the members. Spans never drop below
/// `MIN_EXPANSION_DELTA` and never exceed the current view, so a tap never
/// zooms out.
pub fn get_bounds_for_cluster_expansion(
    cluster: &Cluster,
    target_zoom: u8,
    current: &Viewport,
) -> Viewport {
    let center = cluster.bounds.center();
    let lat_ratio = if current.longitude_delta > 0.0 && current.latitude_delta > 0.0 {
        current.latitude_delta / current.longitude_delta
    } else {
        1.0
    };

    let zoom_delta = zoom_longitude_delta(target_zoom);
    let longitude_delta = zoom_delta.max(cluster.bounds.lon_span() * EXPANSION_PADDING);
    let latitude_delta =
        (zoom_delta * lat_ratio).max(cluster.bounds.lat_span() * EXPANSION_PADDING);

    Viewport::new(
        center.latitude,
        center.longitude,
        latitude_delta
            .max(MIN_EXPANSION_DELTA)
            .min(current.latitude_delta),
        longitude_delta
            .max(MIN_EXPANSION_DELTA)
            .min(current.longitude_delta),
    )
}
