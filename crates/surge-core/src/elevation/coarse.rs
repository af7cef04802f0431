//! Coarse global elevation: padded-box fetch and bilinear lookup per location.
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::coords::{BoundingBox, LatLon};
use crate::error::{Result, SurgeError};
use crate::heightfield::HeightField;

use super::cache::ElevationCache;

/// Padding around the location bounding box for the coarse fetch (degrees).
pub const COARSE_PAD_DEG: f64 = 1.0;

const CACHE_PRODUCT: &str = "coarse";

/// Provider of a coarse global elevation/bathymetry raster.
pub trait CoarseElevationSource {
    /// Raster covering `bbox`. Errors when the request cannot be served.
    fn fetch(&self, bbox: &BoundingBox) -> Result<HeightField>;
}

/// An in-memory raster serves any box it overlaps.
impl CoarseElevationSource for HeightField {
    fn fetch(&self, bbox: &BoundingBox) -> Result<HeightField> {
        self.validate()?;
        self.crop(bbox).ok_or_else(|| {
            SurgeError::ElevationUnavailable(format!(
                "raster [{}, {}]×[{}, {}] does not cover the requested box",
                self.min_lon, self.max_lon, self.min_lat, self.max_lat
            ))
        })
    }
}

/// Cached raster together with the box it was fetched for.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CoarseCacheEntry {
    bbox: BoundingBox,
    grid: HeightField,
}

impl CoarseCacheEntry {
    fn check(&self, bbox: &BoundingBox) -> Result<()> {
        self.grid.validate()?;
        if self.grid.is_empty() {
            return Err(SurgeError::ElevationUnavailable("cached coarse grid is empty".into()));
        }
        if !self.bbox.covers(bbox) {
            return Err(SurgeError::ElevationUnavailable(format!(
                "cached grid was fetched for lon [{}, {}], lat [{}, {}]",
                self.bbox.min_lon, self.bbox.max_lon, self.bbox.min_lat, self.bbox.max_lat
            )));
        }
        Ok(())
    }
}

/// Per-location coarse elevation in metres, floored at zero.
#[derive(Debug, Clone)]
pub struct CoarseElevation {
    pub elevation: Vec<f64>,
}

/// Fetch (or load from cache) a raster around `locations` and interpolate it
/// at every location.
pub fn coarse_elevation(
    locations: &[LatLon],
    source: &dyn CoarseElevationSource,
    cache: &ElevationCache,
) -> Result<CoarseElevation> {
    let bbox = BoundingBox::around(locations.iter().copied())?
        .padded(COARSE_PAD_DEG)
        .clamped_for_fetch();
    bbox.ensure_valid()?;

    let grid = match cache.load(CACHE_PRODUCT, |entry: &CoarseCacheEntry| entry.check(&bbox)) {
        Some(entry) => entry.grid,
        None => {
            info!(
                min_lon = bbox.min_lon, max_lon = bbox.max_lon,
                min_lat = bbox.min_lat, max_lat = bbox.max_lat,
                "fetching coarse elevation"
            );
            let grid = source.fetch(&bbox)?;
            grid.validate()?;
            if grid.is_empty() {
                return Err(SurgeError::ElevationUnavailable("coarse source returned an empty grid".into()));
            }
            let entry = CoarseCacheEntry { bbox, grid };
            cache.store(CACHE_PRODUCT, &entry)?;
            entry.grid
        }
    };

    let (elevation, water) = interpolate(&grid, locations);
    debug!(
        water = water,
        total = locations.len(),
        "coarse elevation interpolated"
    );
    Ok(CoarseElevation { elevation })
}

/// Bilinear lookup floored at zero, plus the number of locations below sea
/// level. Locations outside the raster take the value at the nearest edge.
fn interpolate(grid: &HeightField, locations: &[LatLon]) -> (Vec<f64>, usize) {
    let mut water = 0;
    let elevation = locations
        .iter()
        .map(|p| {
            let lon = p.lon.clamp(grid.min_lon, grid.max_lon);
            let lat = p.lat.clamp(grid.min_lat, grid.max_lat);
            let h = grid.sample(lon, lat).unwrap_or(0.0) as f64;
            if h < 0.0 {
                water += 1;
            }
            h.max(0.0)
        })
        .collect();
    (elevation, water)
}
