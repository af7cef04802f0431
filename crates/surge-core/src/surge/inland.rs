//! Inland decay of surge with distance from the coast.
//!
//! The linear decay has not been validated against a reference surge dataset;
//! treat the rate as a tunable.
use crate::config::SurgeParams;

/// Per-location decay (m) and inland-limit mask.
#[derive(Debug, Clone)]
pub struct InlandDecay {
    /// Height removed from every surge at the location. Infinite beyond the
    /// inland limit.
    pub decay_m: Vec<f64>,
    /// Location lies farther inland than the limit.
    pub beyond_limit: Vec<bool>,
}

impl InlandDecay {
    /// Without distances there is no decay and no limit.
    pub fn new(dist_coast_km: Option<&[f64]>, n_locations: usize, params: &SurgeParams) -> Self {
        let Some(dist) = dist_coast_km else {
            return Self {
                decay_m: vec![0.0; n_locations],
                beyond_limit: vec![false; n_locations],
            };
        };
        let beyond_limit: Vec<bool> = dist.iter().map(|&d| d > params.inland_max_dist_km).collect();
        let decay_m = dist
            .iter()
            .zip(&beyond_limit)
            .map(|(&d, &beyond)| {
                if beyond {
                    f64::INFINITY
                } else {
                    let buffered = (d - params.decay_buffer_km).max(0.0);
                    (buffered * params.decay_rate_m_per_km).max(0.0)
                }
            })
            .collect();
        Self { decay_m, beyond_limit }
    }
}
