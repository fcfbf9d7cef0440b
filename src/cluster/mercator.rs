//! Web Mercator projection onto the unit square
//!
//! `x` grows eastwards from 0 at -180° to 1 at 180°, `y` grows southwards
//! from 0 at the northern clamp latitude to 1 at the southern one.

use std::f64::consts::PI;

/// Latitude beyond which Web Mercator is undefined for map purposes
pub const MAX_LATITUDE: f64 = 85.05112878;

#[inline(always)]
pub fn lng_x(lng: f64) -> f64 {
    lng / 360.0 + 0.5
}

#[inline(always)]
pub fn lat_y(lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let sin = (lat * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    y.clamp(0.0, 1.0)
}

#[inline(always)]
pub fn x_lng(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

#[inline(always)]
pub fn y_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}

/// Size of the projected world in pixels at a zoom level
#[inline(always)]
pub fn world_size(extent: u32, zoom: u8) -> f64 {
    extent as f64 * 2f64.powi(zoom as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_origin() {
        assert_eq!(lng_x(0.0), 0.5);
        assert!((lat_y(0.0) - 0.5).abs() < 1e-12);
        assert_eq!(lng_x(-180.0), 0.0);
        assert_eq!(lng_x(180.0), 1.0);
    }

    #[test]
    fn test_poles_are_clamped() {
        assert!((lat_y(90.0) - 0.0).abs() < 1e-9);
        assert!((lat_y(-90.0) - 1.0).abs() < 1e-9);
        assert!(lat_y(90.0).is_finite());
        assert_eq!(lat_y(89.0), lat_y(MAX_LATITUDE));
    }

    #[test]
    fn test_inverse() {
        for lat in [-80.0, -45.5, 0.0, 20.1484, 46.253, 85.0] {
            assert!((y_lat(lat_y(lat)) - lat).abs() < 1e-9);
        }
        for lng in [-180.0, -73.9857, 0.0, 20.1484, 179.9] {
            assert!((x_lng(lng_x(lng)) - lng).abs() < 1e-9);
        }
    }
}
