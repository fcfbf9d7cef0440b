use std::f64::consts::PI;

use super::point::GeoPoint;

/// Coefficient to translate from degrees to radians
pub const DEGREE_RAD: f64 = PI / 180.0;

/// Earth radius in meters
pub const EARTH_R: f64 = 6_371_000.0;

/// Calculates great-circle distance between two points (haversine)
///
/// # Returns
///
/// Distance in meters
pub fn distance_meters(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude * DEGREE_RAD;
    let lat2 = b.latitude * DEGREE_RAD;
    let d_lat = (b.latitude - a.latitude) * DEGREE_RAD;
    let d_lon = (b.longitude - a.longitude) * DEGREE_RAD;

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // clamp guards asin against rounding slightly above 1 for antipodes
    2.0 * EARTH_R * h.sqrt().min(1.0).asin()
}

/// Largest pairwise distance within a group, in meters
pub fn max_pairwise_distance(points: &[GeoPoint]) -> f64 {
    let mut max = 0.0f64;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            max = max.max(distance_meters(a, b));
        }
    }
    max
}
