/// GeoPoint represents a geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Checks that both values are finite and inside the lon/lat ranges
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }
}

/// A decoded record: identifier, coordinate and an opaque payload
///
/// The engine never looks inside `properties`, it only carries it through
/// to the rendered entities.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePoint<P> {
    pub id: String,
    pub geometry: GeoPoint,
    pub properties: P,
}

impl<P> FeaturePoint<P> {
    pub fn new(id: impl Into<String>, geometry: GeoPoint, properties: P) -> Self {
        Self {
            id: id.into(),
            geometry,
            properties,
        }
    }
}

/// A raw record as delivered by the data-access layer
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord<P> {
    pub id: String,
    /// Hex-encoded point geometry
    pub geometry: String,
    pub properties: P,
}

impl<P> RawRecord<P> {
    pub fn new(id: impl Into<String>, geometry: impl Into<String>, properties: P) -> Self {
        Self {
            id: id.into(),
            geometry: geometry.into(),
            properties,
        }
    }
}

/// Axis-aligned lon/lat rectangle
///
/// `west > east` describes a box crossing the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub const WORLD: BoundingBox = BoundingBox {
        west: -180.0,
        south: -90.0,
        east: 180.0,
        north: 90.0,
    };

    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Smallest box holding every point, `None` when there are none
    pub fn around<'a>(points: impl IntoIterator<Item = &'a GeoPoint>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = BoundingBox::new(
            first.longitude,
            first.latitude,
            first.longitude,
            first.latitude,
        );
        for pt in iter {
            bbox.extend(pt);
        }
        Some(bbox)
    }

    pub fn extend(&mut self, pt: &GeoPoint) {
        self.west = self.west.min(pt.longitude);
        self.east = self.east.max(pt.longitude);
        self.south = self.south.min(pt.latitude);
        self.north = self.north.max(pt.latitude);
    }

    /// Merges another box into this one (boxes must not cross the antimeridian)
    pub fn union(&mut self, other: &BoundingBox) {
        self.west = self.west.min(other.west);
        self.east = self.east.max(other.east);
        self.south = self.south.min(other.south);
        self.north = self.north.max(other.north);
    }

    /// Closed containment test, aware of antimeridian-crossing boxes
    pub fn contains(&self, pt: &GeoPoint) -> bool {
        let in_lon = if self.west <= self.east {
            pt.longitude >= self.west && pt.longitude <= self.east
        } else {
            pt.longitude >= self.west || pt.longitude <= self.east
        };
        in_lon && pt.latitude >= self.south && pt.latitude <= self.north
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new((self.west + self.east) / 2.0, (self.south + self.north) / 2.0)
    }

    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }
}

/// Calculates the arithmetic-mean centroid and the bounds of a set of points
///
/// Returns `None` for an empty set.
pub fn centroid_and_bounds<'a>(
    points: impl IntoIterator<Item = &'a GeoPoint>,
) -> Option<(GeoPoint, BoundingBox)> {
    let mut count = 0usize;
    let mut sum_lon = 0.0;
    let mut sum_lat = 0.0;
    let mut bounds: Option<BoundingBox> = None;

    for pt in points {
        count += 1;
        sum_lon += pt.longitude;
        sum_lat += pt.latitude;
        match bounds.as_mut() {
            Some(b) => b.extend(pt),
            None => bounds = BoundingBox::around([pt]),
        }
    }

    let bounds = bounds?;
    let n = count as f64;
    Some((GeoPoint::new(sum_lon / n, sum_lat / n), bounds))
}
