//! Run-wide settings and per-component parameters.
//!
//! Every entry point takes the struct it needs by reference; nothing here is
//! global. All structs deserialize from a partial JSON object, missing fields
//! take their defaults.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings shared by every stage of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Run the fine-elevation location loop on the rayon pool. Ignored unless
    /// the crate is built with the `threading` feature.
    pub parallel: bool,
    /// Directory holding cached elevation grids.
    pub cache_dir: PathBuf,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            parallel: false,
            cache_dir: PathBuf::from("data/elevation_cache"),
        }
    }
}

/// Parameters of the wind → surge conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurgeParams {
    /// Sea level rise added to every converted surge height (m).
    pub slr_increment_m: f64,
    /// Distance from the coast (km) before inland decay starts.
    pub decay_buffer_km: f64,
    /// Locations farther inland than this (km) get no surge.
    pub inland_max_dist_km: f64,
    /// Surge loss per km inland (m/km).
    pub decay_rate_m_per_km: f64,
    /// Surges below this height (m) after elevation subtraction are dropped.
    /// Coarse strategy only.
    pub precision_margin_m: f64,
}

impl Default for SurgeParams {
    fn default() -> Self {
        Self {
            slr_increment_m: 0.0,
            decay_buffer_km: 3.0,
            inland_max_dist_km: 50.0,
            decay_rate_m_per_km: 0.2,
            precision_margin_m: 0.05,
        }
    }
}

/// Parameters of the landfall decay fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayFitParams {
    /// Use environmental pressure at segment end for the asymptote S.
    /// When false, S is the segment's end pressure over its landfall pressure.
    pub normalize_to_environment: bool,
    /// Time step the tracks are resampled to before fitting (hours).
    pub time_step_h: f64,
    /// Expected synthetic tracks per original when the input is mixed.
    pub synthetic_per_original: usize,
}

impl Default for DecayFitParams {
    fn default() -> Self {
        Self {
            normalize_to_environment: true,
            time_step_h: 1.0,
            synthetic_per_original: 1,
        }
    }
}
