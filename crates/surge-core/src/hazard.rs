//! Hazard footprint data model: locations plus event × location fields.
use serde::{Deserialize, Serialize};

use crate::coords::LatLon;
use crate::error::{Result, SurgeError};
use crate::sparse::CsrMatrix;

/// Peril id of a tropical-cyclone wind footprint.
pub const WIND_PERIL: &str = "TC";
/// Peril id written by the surge conversion.
pub const SURGE_PERIL: &str = "TCSurgeBathtub";

/// A hazard location (grid cell or point).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    /// Stable identifier, used to match externally supplied elevation.
    pub id: i64,
    pub lon: f64,
    pub lat: f64,
}

impl Centroid {
    pub fn new(id: i64, lon: f64, lat: f64) -> Self {
        Self { id, lon, lat }
    }

    pub fn latlon(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

/// Per-event, per-location hazard intensities with their location set.
///
/// Position in `centroids` is the column index of `intensity` and `fraction`
/// and the index into every per-location vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardFootprintSet {
    pub peril_id: String,
    pub units: String,
    #[serde(default)]
    pub comment: String,
    pub centroids: Vec<Centroid>,
    /// One id per event row.
    pub event_ids: Vec<u64>,
    /// Event × location. Wind speed (m/s) on input, surge height (m) on output.
    pub intensity: CsrMatrix,
    /// Event × location areal fraction in [0, 1]. `None` means 1 wherever
    /// intensity is stored.
    #[serde(default)]
    pub fraction: Option<CsrMatrix>,
    /// Ground height per location (m above sea level).
    #[serde(default)]
    pub elevation: Option<Vec<f64>>,
    /// Signed distance to coast per location (km, negative offshore).
    #[serde(default)]
    pub dist_coast_km: Option<Vec<f64>>,
}

impl HazardFootprintSet {
    /// A wind footprint with no elevation or coastal distance attached.
    pub fn wind(centroids: Vec<Centroid>, event_ids: Vec<u64>, intensity: CsrMatrix) -> Result<Self> {
        let hazard = Self {
            peril_id: WIND_PERIL.to_string(),
            units: "m/s".to_string(),
            comment: String::new(),
            centroids,
            event_ids,
            intensity,
            fraction: None,
            elevation: None,
            dist_coast_km: None,
        };
        hazard.validate()?;
        Ok(hazard)
    }

    pub fn n_locations(&self) -> usize {
        self.centroids.len()
    }

    pub fn n_events(&self) -> usize {
        self.event_ids.len()
    }

    pub fn locations(&self) -> impl Iterator<Item = LatLon> + '_ {
        self.centroids.iter().map(Centroid::latlon)
    }

    /// Check that every per-location array and matrix agrees on shape.
    pub fn validate(&self) -> Result<()> {
        let n_loc = self.n_locations();
        let n_ev = self.n_events();
        self.intensity.validate()?;
        check_len("intensity columns", n_loc, self.intensity.n_cols)?;
        check_len("intensity rows", n_ev, self.intensity.n_rows)?;
        if let Some(fraction) = &self.fraction {
            fraction.validate()?;
            check_len("fraction columns", n_loc, fraction.n_cols)?;
            check_len("fraction rows", n_ev, fraction.n_rows)?;
        }
        if let Some(elev) = &self.elevation {
            check_len("elevation", n_loc, elev.len())?;
        }
        if let Some(dist) = &self.dist_coast_km {
            check_len("dist_coast_km", n_loc, dist.len())?;
        }
        Ok(())
    }
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(SurgeError::ShapeMismatch { what, expected, actual })
    }
}
