use tracing::warn;

use super::point::{FeaturePoint, RawRecord};
use super::wkb::decode_hex;

/// Decodes a batch of raw records into feature points
///
/// Records whose geometry does not decode are dropped with a warning; the
/// batch itself never fails. Output keeps the input order.
pub fn decode_batch<P: Clone>(records: &[RawRecord<P>]) -> Vec<FeaturePoint<P>> {
    let mut points = Vec::with_capacity(records.len());

    for record in records {
        match decode_hex(&record.geometry) {
            Ok(geometry) => points.push(FeaturePoint {
                id: record.id.clone(),
                geometry,
                properties: record.properties.clone(),
            }),
            Err(e) => warn!(
                record_id = %record.id,
                error = %e,
                "dropping record with undecodable geometry"
            ),
        }
    }

    points
}
