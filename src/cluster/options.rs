use serde::{Deserialize, Serialize};

use crate::error::OptionsError;

/// Highest zoom level an index may be built for
pub const MAX_SUPPORTED_ZOOM: u8 = 20;

/// Tuning of the hierarchical cluster index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterOptions {
    /// Cluster radius in screen pixels
    pub radius: u32,
    /// Maximum zoom level at which clusters are generated
    pub max_zoom: u8,
    /// Minimum zoom level at which clusters are generated
    pub min_zoom: u8,
    /// Minimum number of points to form a cluster
    pub min_points: usize,
    /// Tile extent the radius is relative to
    pub extent: u32,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            radius: 50,
            max_zoom: 16,
            min_zoom: 0,
            min_points: 2,
            extent: 512,
        }
    }
}

impl ClusterOptions {
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.radius == 0 {
            return Err(OptionsError::InvalidOptions("radius must be > 0".into()));
        }
        if self.extent == 0 {
            return Err(OptionsError::InvalidOptions("extent must be > 0".into()));
        }
        if self.min_zoom > self.max_zoom {
            return Err(OptionsError::InvalidOptions(format!(
                "minZoom {} is greater than maxZoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.max_zoom > MAX_SUPPORTED_ZOOM {
            return Err(OptionsError::InvalidOptions(format!(
                "maxZoom {} exceeds {MAX_SUPPORTED_ZOOM}",
                self.max_zoom
            )));
        }
        if self.min_points < 2 {
            return Err(OptionsError::InvalidOptions(
                "minPoints must be at least 2".into(),
            ));
        }
        Ok(())
    }
}
