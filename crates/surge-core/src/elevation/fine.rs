//! Fine local elevation: dense samples grouped by the hazard location they
//! fall to.
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::coords::{BoundingBox, LatLon};
use crate::error::{Result, SurgeError};
use crate::heightfield::HeightField;
use crate::storage::null_as_nan;

use super::cache::ElevationCache;
use super::regrid::{half_nearest_distances, Regridder};

/// Padding around the location bounding box for the fine fetch (degrees).
pub const FINE_PAD_DEG: f64 = 0.1;

const CACHE_PRODUCT: &str = "fine";

/// Scattered elevation samples, parallel arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleGrid {
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    /// Metres above sea level.
    pub height: Vec<f32>,
}

impl SampleGrid {
    /// Every node of a raster as a sample.
    pub fn from_heightfield(hf: &HeightField) -> Self {
        let n = hf.width * hf.height;
        let mut grid = Self {
            lon: Vec::with_capacity(n),
            lat: Vec::with_capacity(n),
            height: Vec::with_capacity(n),
        };
        for r in 0..hf.height {
            let lat = hf.node_lat(r);
            for c in 0..hf.width {
                grid.lon.push(hf.node_lon(c));
                grid.lat.push(lat);
                grid.height.push(hf.get(r, c));
            }
        }
        grid
    }

    pub fn len(&self) -> usize {
        self.height.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height.is_empty()
    }

    /// Samples inside `bbox`.
    pub fn window(&self, bbox: &BoundingBox) -> Self {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&i| bbox.contains(self.lon[i], self.lat[i]))
            .collect();
        Self {
            lon: keep.iter().map(|&i| self.lon[i]).collect(),
            lat: keep.iter().map(|&i| self.lat[i]).collect(),
            height: keep.iter().map(|&i| self.height[i]).collect(),
        }
    }
}

/// Provider of high-density local elevation samples.
pub trait FineElevationSource {
    /// Samples covering `bbox`; may extend past it.
    fn fetch(&self, bbox: &BoundingBox) -> Result<SampleGrid>;
}

impl FineElevationSource for HeightField {
    fn fetch(&self, bbox: &BoundingBox) -> Result<SampleGrid> {
        self.validate()?;
        self.crop(bbox)
            .map(|hf| SampleGrid::from_heightfield(&hf))
            .ok_or_else(|| SurgeError::ElevationUnavailable("fine raster does not cover the requested box".into()))
    }
}

/// Fine samples plus their assignment to hazard locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FineElevation {
    pub samples: SampleGrid,
    /// Per sample, the location index it belongs to.
    pub sample_to_location: Vec<Option<usize>>,
    /// Per location, mean height of its samples (NaN when it has none).
    #[serde(deserialize_with = "null_as_nan")]
    pub location_elevation: Vec<f64>,
}

impl FineElevation {
    pub fn n_locations(&self) -> usize {
        self.location_elevation.len()
    }

    /// Sample indices grouped by location.
    pub fn samples_by_location(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); self.n_locations()];
        for (s, loc) in self.sample_to_location.iter().enumerate() {
            if let Some(&l) = loc.as_ref().filter(|&&l| l < groups.len()) {
                groups[l].push(s);
            }
        }
        groups
    }

    /// Parallel arrays agree and every assignment names a known location.
    pub fn validate(&self) -> Result<()> {
        let n = self.samples.len();
        for (what, actual) in [
            ("fine sample longitudes", self.samples.lon.len()),
            ("fine sample latitudes", self.samples.lat.len()),
            ("fine sample assignments", self.sample_to_location.len()),
        ] {
            if actual != n {
                return Err(SurgeError::ShapeMismatch { what, expected: n, actual });
            }
        }
        if let Some(&bad) = self.sample_to_location.iter().flatten().find(|&&l| l >= self.n_locations()) {
            return Err(SurgeError::ShapeMismatch {
                what: "fine sample location index",
                expected: self.n_locations(),
                actual: bad,
            });
        }
        Ok(())
    }
}

/// Cached fine elevation together with the locations it was built for.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FineCacheEntry {
    locations: Vec<LatLon>,
    fine: FineElevation,
}

impl FineCacheEntry {
    fn check(&self, locations: &[LatLon]) -> Result<()> {
        if self.locations != locations {
            return Err(SurgeError::ShapeMismatch {
                what: "cached fine elevation locations",
                expected: locations.len(),
                actual: self.locations.len(),
            });
        }
        if self.fine.n_locations() != locations.len() {
            return Err(SurgeError::ShapeMismatch {
                what: "cached fine location elevation",
                expected: locations.len(),
                actual: self.fine.n_locations(),
            });
        }
        self.fine.validate()
    }
}

/// Fetch (or load from cache) fine samples around `locations` and assign each
/// to its nearest location.
pub fn fine_elevation(
    locations: &[LatLon],
    source: &dyn FineElevationSource,
    regridder: &dyn Regridder,
    cache: &ElevationCache,
) -> Result<FineElevation> {
    if let Some(entry) = cache.load(CACHE_PRODUCT, |entry: &FineCacheEntry| entry.check(locations)) {
        return Ok(entry.fine);
    }

    let bbox = BoundingBox::around(locations.iter().copied())?
        .padded(FINE_PAD_DEG)
        .clamped_for_fetch();
    bbox.ensure_valid()?;

    let samples = source.fetch(&bbox)?.window(&bbox);
    if samples.is_empty() {
        return Err(SurgeError::ElevationUnavailable("fine source returned no samples in the window".into()));
    }
    info!(samples = samples.len(), locations = locations.len(), "regridding fine elevation");

    let radius = half_nearest_distances(locations);
    let regridded = regridder.regrid(&samples, locations, &radius)?;
    if regridded.sample_to_target.len() != samples.len() {
        return Err(SurgeError::RegridMismatch {
            expected: samples.len(),
            actual: regridded.sample_to_target.len(),
        });
    }
    if regridded.target_values.len() != locations.len() {
        return Err(SurgeError::ShapeMismatch {
            what: "regridded target values",
            expected: locations.len(),
            actual: regridded.target_values.len(),
        });
    }

    let fine = FineElevation {
        samples,
        sample_to_location: regridded.sample_to_target,
        location_elevation: regridded.target_values,
    };
    let empty = fine.location_elevation.iter().filter(|v| v.is_nan()).count();
    if empty > 0 {
        warn!(locations = empty, "locations received no fine elevation samples");
    }
    let entry = FineCacheEntry { locations: locations.to_vec(), fine };
    cache.store(CACHE_PRODUCT, &entry)?;
    Ok(entry.fine)
}
