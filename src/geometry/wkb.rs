//! Point geometry in the (E)WKB layout emitted by the spatial database
//!
//! ```text
//! byte 0      byte order flag, 0 = big-endian (XDR), 1 = little-endian (NDR)
//! bytes 1..5  geometry type code; 0x20000000 flags a 4-byte SRID
//! [4 bytes]   SRID, only when flagged
//! 8 bytes     X (longitude), IEEE-754 double
//! 8 bytes     Y (latitude), IEEE-754 double
//! ```

use std::io::Cursor;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use super::point::GeoPoint;
use crate::error::DecodeError;

/// Type code of a Point in the low bits of the type field
pub const POINT_TYPE: u32 = 1;

/// EWKB flag: an SRID follows the type field
pub const SRID_FLAG: u32 = 0x2000_0000;

/// EWKB flags for Z and M ordinates
const Z_FLAG: u32 = 0x8000_0000;
const M_FLAG: u32 = 0x4000_0000;

/// Low 29 bits carry the base geometry type
const TYPE_MASK: u32 = 0x1FFF_FFFF;

const HEADER_LEN: usize = 5;
const SRID_LEN: usize = 4;
const COORDS_LEN: usize = 16;

/// Byte order of an encoded geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WkbByteOrder {
    BigEndian,
    LittleEndian,
}

impl WkbByteOrder {
    fn from_flag(flag: u8) -> Result<Self, DecodeError> {
        match flag {
            0 => Ok(WkbByteOrder::BigEndian),
            1 => Ok(WkbByteOrder::LittleEndian),
            other => Err(DecodeError::MalformedInput(format!(
                "invalid byte order flag {other}"
            ))),
        }
    }

    fn flag(self) -> u8 {
        match self {
            WkbByteOrder::BigEndian => 0,
            WkbByteOrder::LittleEndian => 1,
        }
    }
}

/// Decodes a point geometry from raw bytes
pub fn decode(bytes: &[u8]) -> Result<GeoPoint, DecodeError> {
    if bytes.len() < HEADER_LEN {
        return Err(DecodeError::MalformedInput(format!(
            "{} bytes is too short for a geometry header",
            bytes.len()
        )));
    }

    let order = WkbByteOrder::from_flag(bytes[0])?;
    match order {
        WkbByteOrder::BigEndian => decode_with::<BigEndian>(bytes),
        WkbByteOrder::LittleEndian => decode_with::<LittleEndian>(bytes),
    }
}

/// Decodes a hex-encoded point geometry
///
/// Accepts an optional `\x` (bytea) or `0x` prefix.
pub fn decode_hex(text: &str) -> Result<GeoPoint, DecodeError> {
    let text = text.trim();
    let text = text
        .strip_prefix("\\x")
        .or_else(|| text.strip_prefix("0x"))
        .unwrap_or(text);
    let bytes = hex::decode(text).map_err(|e| DecodeError::MalformedInput(e.to_string()))?;
    decode(&bytes)
}

fn decode_with<B: byteorder::ByteOrder>(bytes: &[u8]) -> Result<GeoPoint, DecodeError> {
    let mut cursor = Cursor::new(&bytes[1..]);
    let type_code = cursor.read_u32::<B>().map_err(short_input)?;

    if type_code & (Z_FLAG | M_FLAG) != 0 || type_code & TYPE_MASK != POINT_TYPE {
        return Err(DecodeError::UnsupportedGeometryType(type_code));
    }

    let has_srid = type_code & SRID_FLAG != 0;
    let expected = HEADER_LEN + if has_srid { SRID_LEN } else { 0 } + COORDS_LEN;
    if bytes.len() != expected {
        return Err(DecodeError::MalformedInput(format!(
            "point geometry needs {expected} bytes, got {}",
            bytes.len()
        )));
    }

    if has_srid {
        // SRID is not interpreted, coordinates are taken as lon/lat
        cursor.read_u32::<B>().map_err(short_input)?;
    }

    let longitude = cursor.read_f64::<B>().map_err(short_input)?;
    let latitude = cursor.read_f64::<B>().map_err(short_input)?;

    let point = GeoPoint::new(longitude, latitude);
    if !point.is_valid() {
        return Err(DecodeError::InvalidCoordinate {
            longitude,
            latitude,
        });
    }
    Ok(point)
}

fn short_input(e: std::io::Error) -> DecodeError {
    DecodeError::MalformedInput(e.to_string())
}

/// Encodes a point in the same layout `decode` reads
pub fn encode_point(point: &GeoPoint, order: WkbByteOrder, srid: Option<u32>) -> Vec<u8> {
    match order {
        WkbByteOrder::BigEndian => encode_with::<BigEndian>(point, order, srid),
        WkbByteOrder::LittleEndian => encode_with::<LittleEndian>(point, order, srid),
    }
}

fn encode_with<B: byteorder::ByteOrder>(
    point: &GeoPoint,
    order: WkbByteOrder,
    srid: Option<u32>,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + SRID_LEN + COORDS_LEN);
    out.push(order.flag());

    let type_code = match srid {
        Some(_) => POINT_TYPE | SRID_FLAG,
        None => POINT_TYPE,
    };

    // writes into a Vec cannot fail
    let _ = out.write_u32::<B>(type_code);
    if let Some(srid) = srid {
        let _ = out.write_u32::<B>(srid);
    }
    let _ = out.write_f64::<B>(point.longitude);
    let _ = out.write_f64::<B>(point.latitude);
    out
}
