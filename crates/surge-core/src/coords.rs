/// Geographic coordinate types and bounding boxes.
/// All coordinate math uses f64 for precision.
use serde::{Deserialize, Serialize};

use crate::error::{Result, SurgeError};

/// Longitude range accepted by elevation fetch requests.
pub const FETCH_LON_RANGE: (f64, f64) = (-179.0, 179.0);
/// Latitude range accepted by elevation fetch requests.
pub const FETCH_LAT_RANGE: (f64, f64) = (-60.95, 89.0);

/// A point on the sphere in geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees, -90 to +90.
    pub lat: f64,
    /// Longitude in degrees, -180 to +180.
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Planar distance in degrees. Good enough at the sub-degree scales the
    /// fine elevation path works on.
    pub fn deg_distance(self, other: LatLon) -> f64 {
        (self.lat - other.lat).hypot(self.lon - other.lon)
    }
}

/// Axis-aligned lon/lat rectangle, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self { min_lon, min_lat, max_lon, max_lat }
    }

    /// Tightest box around `points`. Errors when `points` is empty.
    pub fn around<I>(points: I) -> Result<Self>
    where
        I: IntoIterator<Item = LatLon>,
    {
        let mut it = points.into_iter();
        let first = it.next().ok_or(SurgeError::NoLocations)?;
        let mut bbox = Self::new(first.lon, first.lat, first.lon, first.lat);
        for p in it {
            bbox.min_lon = bbox.min_lon.min(p.lon);
            bbox.max_lon = bbox.max_lon.max(p.lon);
            bbox.min_lat = bbox.min_lat.min(p.lat);
            bbox.max_lat = bbox.max_lat.max(p.lat);
        }
        Ok(bbox)
    }

    /// Grow the box by `deg` on every side.
    pub fn padded(&self, deg: f64) -> Self {
        Self::new(
            self.min_lon - deg,
            self.min_lat - deg,
            self.max_lon + deg,
            self.max_lat + deg,
        )
    }

    /// Clamp to the ranges elevation services accept.
    pub fn clamped_for_fetch(&self) -> Self {
        let lon = |v: f64| v.clamp(FETCH_LON_RANGE.0, FETCH_LON_RANGE.1);
        let lat = |v: f64| v.clamp(FETCH_LAT_RANGE.0, FETCH_LAT_RANGE.1);
        Self::new(lon(self.min_lon), lat(self.min_lat), lon(self.max_lon), lat(self.max_lat))
    }

    /// Errors unless the box has positive extent on both axes.
    pub fn ensure_valid(&self) -> Result<()> {
        let finite = [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
            .iter()
            .all(|v| v.is_finite());
        if finite && self.max_lon > self.min_lon && self.max_lat > self.min_lat {
            Ok(())
        } else {
            Err(SurgeError::DegenerateBounds {
                min_lon: self.min_lon,
                max_lon: self.max_lon,
                min_lat: self.min_lat,
                max_lat: self.max_lat,
            })
        }
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// True when `other` lies entirely inside this box.
    pub fn covers(&self, other: &BoundingBox) -> bool {
        self.contains(other.min_lon, other.min_lat) && self.contains(other.max_lon, other.max_lat)
    }
}
