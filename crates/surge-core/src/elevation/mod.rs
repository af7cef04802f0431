//! Elevation attachment for hazard locations.
//!
//! Precedence, first match wins:
//!   1. elevation already on the hazard and no source override requested;
//!   2. supplied elevation whose ids match the hazard's ids in order;
//!   3. fetch from the coarse (default) or fine source.
pub mod cache;
pub mod coarse;
pub mod fine;
pub mod regrid;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::RunSettings;
use crate::coords::LatLon;
use crate::error::{Result, SurgeError};
use crate::hazard::HazardFootprintSet;

use cache::ElevationCache;
use coarse::{coarse_elevation, CoarseElevationSource};
use fine::{fine_elevation, FineElevation, FineElevationSource};
use regrid::{NearestRegridder, Regridder};

/// Which elevation provider to fetch from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElevationSource {
    Coarse,
    Fine,
}

/// Elevation values computed elsewhere, keyed by location id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppliedElevation {
    pub ids: Vec<i64>,
    pub elevation: Vec<f64>,
}

impl SuppliedElevation {
    /// True when the ids equal the hazard's location ids, in the same order.
    pub fn aligns_with(&self, hazard: &HazardFootprintSet) -> bool {
        self.ids.len() == self.elevation.len()
            && self.ids.len() == hazard.n_locations()
            && self.ids.iter().zip(&hazard.centroids).all(|(&id, c)| id == c.id)
    }
}

/// The collaborators available for fetching elevation.
pub struct ElevationProviders<'a> {
    pub coarse: Option<&'a dyn CoarseElevationSource>,
    pub fine: Option<&'a dyn FineElevationSource>,
    pub regridder: &'a dyn Regridder,
}

impl Default for ElevationProviders<'_> {
    fn default() -> Self {
        Self {
            coarse: None,
            fine: None,
            regridder: &NearestRegridder,
        }
    }
}

/// How the caller wants elevation attached.
#[derive(Debug, Clone, Default)]
pub struct ElevationRequest<'a> {
    /// Force a fetch from this source even if elevation is already attached.
    pub source_override: Option<ElevationSource>,
    pub supplied: Option<&'a SuppliedElevation>,
    /// Identity of the location set for the elevation cache. A no-save
    /// sentinel disables caching.
    pub cache_key: &'a str,
}

/// Elevation the surge engine works with.
#[derive(Debug, Clone)]
pub enum AttachedElevation {
    /// One height per location, on `HazardFootprintSet::elevation`.
    PerLocation,
    /// Per-location means on the hazard plus the samples behind them.
    Fine(FineElevation),
}

impl AttachedElevation {
    pub fn label(&self) -> &'static str {
        match self {
            AttachedElevation::PerLocation => "per-location",
            AttachedElevation::Fine(_) => "fine",
        }
    }
}

/// Attach elevation to `hazard` following the precedence above.
///
/// A failing fetch is returned as an error and leaves `hazard.elevation`
/// untouched; callers must not run the surge conversion afterwards.
pub fn attach_elevation(
    hazard: &mut HazardFootprintSet,
    request: &ElevationRequest<'_>,
    providers: &ElevationProviders<'_>,
    settings: &RunSettings,
) -> Result<AttachedElevation> {
    hazard.validate()?;

    if request.source_override.is_none() && hazard.elevation.is_some() {
        info!("using elevation already attached to the hazard");
        return Ok(AttachedElevation::PerLocation);
    }

    if let Some(supplied) = request.supplied {
        if supplied.aligns_with(hazard) {
            info!(locations = supplied.ids.len(), "attaching supplied elevation");
            hazard.elevation = Some(supplied.elevation.clone());
            return Ok(AttachedElevation::PerLocation);
        }
        warn!(
            supplied = supplied.ids.len(),
            locations = hazard.n_locations(),
            "supplied elevation ids do not match hazard locations; fetching instead"
        );
    }

    let locations: Vec<LatLon> = hazard.locations().collect();
    let cache = ElevationCache::new(&settings.cache_dir, request.cache_key);

    match request.source_override.unwrap_or(ElevationSource::Coarse) {
        ElevationSource::Coarse => {
            let source = providers
                .coarse
                .ok_or_else(|| SurgeError::ElevationUnavailable("no coarse elevation source configured".into()))?;
            let coarse = coarse_elevation(&locations, source, &cache)?;
            hazard.elevation = Some(coarse.elevation);
            Ok(AttachedElevation::PerLocation)
        }
        ElevationSource::Fine => {
            let source = providers
                .fine
                .ok_or_else(|| SurgeError::ElevationUnavailable("no fine elevation source configured".into()))?;
            let fine = fine_elevation(&locations, source, providers.regridder, &cache)?;
            hazard.elevation = Some(fine.location_elevation.clone());
            Ok(AttachedElevation::Fine(fine))
        }
    }
}
