//! Point geometry decoding and great-circle distance
pub mod batch;
pub mod distance;
pub mod point;
pub mod wkb;


pub use batch::decode_batch;
pub use distance::{DEGREE_RAD, EARTH_R, distance_meters, max_pairwise_distance};
pub use point::{BoundingBox, FeaturePoint, GeoPoint, RawRecord, centroid_and_bounds};
pub use wkb::{WkbByteOrder, decode, decode_hex, encode_point};
