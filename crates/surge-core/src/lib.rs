//! Storm surge footprints from tropical cyclone wind footprints, plus the
//! post-landfall pressure decay fit.
pub mod config;
pub mod coords;
pub mod elevation;
pub mod error;
pub mod hazard;
pub mod heightfield;
pub mod landfall;
pub mod sparse;
pub mod storage;
pub mod surge;

pub use config::{DecayFitParams, RunSettings, SurgeParams};
pub use elevation::{attach_elevation, AttachedElevation, ElevationProviders, ElevationRequest, ElevationSource};
pub use error::{Result, SurgeError};
pub use hazard::HazardFootprintSet;
pub use landfall::{fit_landfall_decay, DecayFit};
pub use surge::{generate_surge, SurgeSummary};
