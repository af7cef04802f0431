//! Storm-surge footprint from a tropical-cyclone wind footprint ("bathtub"
//! model).
//!
//! Pipeline:
//!   1. wind → surge on stored entries, plus sea level rise;
//!   2. inland decay from distance to coast;
//!   3. elevation subtraction, coarse (direct) or fine (sub-sample mean);
//!   4. clamps: [0, 10] m, ground at or above 10 m, inland limit;
//!   5. metadata, fraction and re-sparsification.
pub mod coarse;
pub mod conversion;
pub mod fine;
pub mod inland;

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{RunSettings, SurgeParams};
use crate::elevation::AttachedElevation;
use crate::error::{Result, SurgeError};
use crate::hazard::{HazardFootprintSet, SURGE_PERIL};
use crate::sparse::CsrMatrix;

use coarse::{location_offsets, subtract_offsets, IterationOrder};
use conversion::wind_to_surge;
use fine::apply_fine;
use inland::InlandDecay;

/// Surge heights are clamped to this value (m).
pub const MAX_SURGE_M: f64 = 10.0;
/// Ground at or above this height (m) never floods.
pub const MAX_ELEVATION_M: f64 = 10.0;

/// Elevation strategy used for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurgeStrategy {
    Coarse(IterationOrder),
    Fine,
}

/// What a conversion produced.
#[derive(Debug, Clone, Serialize)]
pub struct SurgeSummary {
    pub events: usize,
    pub locations: usize,
    /// Stored (nonzero) surge values.
    pub stored_fields: usize,
    pub density: f64,
    pub strategy: SurgeStrategy,
    /// Locations handled by fine sub-sampling. Zero for the coarse strategy.
    pub fine_locations: usize,
    pub generation_time_ms: u64,
}

/// Convert a wind footprint with elevation attached into a surge footprint,
/// in place.
///
/// Errors before touching any field when the hazard is already a surge
/// footprint, has no elevation, or the fine elevation was built for another
/// location set.
pub fn generate_surge(
    hazard: &mut HazardFootprintSet,
    elevation: &AttachedElevation,
    params: &SurgeParams,
    settings: &RunSettings,
) -> Result<SurgeSummary> {
    let start = Instant::now();
    hazard.validate()?;
    if hazard.peril_id == SURGE_PERIL {
        return Err(SurgeError::AlreadyConverted(hazard.peril_id.clone()));
    }
    let ground = hazard.elevation.clone().ok_or(SurgeError::MissingElevation)?;
    if let AttachedElevation::Fine(fine) = elevation {
        if fine.n_locations() != hazard.n_locations() {
            return Err(SurgeError::ShapeMismatch {
                what: "fine elevation locations",
                expected: hazard.n_locations(),
                actual: fine.n_locations(),
            });
        }
        fine.validate()?;
    }
    let n_loc = hazard.n_locations();
    let n_ev = hazard.n_events();
    info!(events = n_ev, locations = n_loc, elevation = elevation.label(), "generating surge footprint");

    // 1. Wind → surge, stored entries only.
    let slr = params.slr_increment_m;
    hazard
        .intensity
        .map_stored(|_, _, v| if v == 0.0 { 0.0 } else { wind_to_surge(v, slr) });
    let mut fraction = aligned_fraction(&hazard.intensity, hazard.fraction.as_ref());

    // 2. Inland decay.
    let inland = InlandDecay::new(hazard.dist_coast_km.as_deref(), n_loc, params);

    // 3. Elevation.
    let (strategy, fine_locations) = match elevation {
        AttachedElevation::PerLocation => {
            let order = IterationOrder::for_shape(n_ev, n_loc);
            debug!(?order, "coarse elevation subtraction");
            let offsets = location_offsets(&ground, &inland.decay_m, params.precision_margin_m);
            subtract_offsets(&mut hazard.intensity, &offsets, order);
            (SurgeStrategy::Coarse(order), 0)
        }
        AttachedElevation::Fine(fine) => {
            let processed = apply_fine(
                &mut hazard.intensity,
                &mut fraction,
                fine,
                &ground,
                &inland,
                settings.parallel,
            );
            (SurgeStrategy::Fine, processed)
        }
    };

    // 4. Clamps.
    hazard.intensity.map_stored(|_, loc, v| {
        if ground[loc] >= MAX_ELEVATION_M || inland.beyond_limit[loc] {
            0.0
        } else {
            v.clamp(0.0, MAX_SURGE_M)
        }
    });

    // 5. Finalize.
    let keep: Vec<bool> = hazard.intensity.data.iter().map(|&v| v != 0.0).collect();
    hazard.intensity.retain_where(&keep);
    fraction.retain_where(&keep);
    hazard.fraction = Some(fraction);
    hazard.peril_id = SURGE_PERIL.to_string();
    hazard.units = "m".to_string();
    hazard.comment = format!(
        "TC surge from wind footprint; elevation: {}; slr: {slr} m",
        elevation.label()
    );

    let summary = SurgeSummary {
        events: n_ev,
        locations: n_loc,
        stored_fields: hazard.intensity.nnz(),
        density: hazard.intensity.density(),
        strategy,
        fine_locations,
        generation_time_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        fields = summary.stored_fields,
        density = summary.density,
        elapsed_ms = summary.generation_time_ms,
        "surge footprint generated"
    );
    Ok(summary)
}

/// Fraction with the intensity's sparsity pattern: the given fraction where it
/// has a nonzero value, 1 elsewhere.
fn aligned_fraction(intensity: &CsrMatrix, fraction: Option<&CsrMatrix>) -> CsrMatrix {
    let mut out = intensity.with_pattern_value(1.0);
    if let Some(given) = fraction {
        out.map_stored(|ev, loc, one| match given.get(ev, loc) {
            f if f > 0.0 => f.min(1.0),
            _ => one,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevation::fine::{FineElevation, SampleGrid};
    use crate::hazard::Centroid;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn hazard(dense: &[f64], elevation: &[f64], dist: Option<Vec<f64>>) -> HazardFootprintSet {
        let n_loc = elevation.len();
        let n_ev = dense.len() / n_loc;
        let centroids = (0..n_loc)
            .map(|i| Centroid::new(i as i64, -80.0 + i as f64 * 0.01, 25.0))
            .collect();
        let intensity = CsrMatrix::from_dense(n_ev, n_loc, dense).unwrap();
        let mut h = HazardFootprintSet::wind(centroids, (0..n_ev as u64).collect(), intensity).unwrap();
        h.elevation = Some(elevation.to_vec());
        h.dist_coast_km = dist;
        h
    }

    fn no_decay() -> SurgeParams {
        SurgeParams { decay_rate_m_per_km: 0.0, ..SurgeParams::default() }
    }

    fn convert(h: &mut HazardFootprintSet, params: &SurgeParams) -> SurgeSummary {
        generate_surge(h, &AttachedElevation::PerLocation, params, &RunSettings::default()).unwrap()
    }

    #[test]
    fn thirty_ms_at_one_metre_ground() {
        let mut h = hazard(&[30.0], &[1.0], None);
        convert(&mut h, &no_decay());
        assert_abs_diff_eq!(h.intensity.get(0, 0), 1.1037, epsilon = 1e-3);
        assert_abs_diff_eq!(
            h.intensity.get(0, 0),
            wind_to_surge(30.0, 0.0) - 1.0 - 0.05,
            epsilon = 1e-12
        );
        assert_eq!(h.peril_id, SURGE_PERIL);
        assert_eq!(h.units, "m");
    }

    #[test]
    fn twenty_ms_at_sea_level_with_slr() {
        let params = SurgeParams { slr_increment_m: 0.5, precision_margin_m: 0.0, ..no_decay() };
        let mut h = hazard(&[20.0], &[0.0], None);
        convert(&mut h, &params);
        assert_abs_diff_eq!(h.intensity.get(0, 0), 2.3288, epsilon = 1e-12);
    }

    #[test]
    fn unstored_cells_stay_empty() {
        let mut h = hazard(&[30.0, 0.0, 0.0, 45.0], &[0.0, 0.0], None);
        convert(&mut h, &no_decay());
        assert_eq!(h.intensity.nnz(), 2);
        assert_eq!(h.intensity.get(0, 1), 0.0);
        assert_eq!(h.intensity.get(1, 0), 0.0);
    }

    #[test]
    fn high_ground_never_floods() {
        // 120 m/s gives a raw surge above 11 m.
        let mut h = hazard(&[120.0, 120.0, 120.0], &[5.0, 10.0, 25.0], None);
        convert(&mut h, &no_decay());
        assert!(h.intensity.get(0, 0) > 0.0);
        assert_eq!(h.intensity.get(0, 1), 0.0);
        assert_eq!(h.intensity.get(0, 2), 0.0);
    }

    #[test]
    fn surge_is_clamped_to_ten_metres() {
        let mut h = hazard(&[200.0], &[0.0], None);
        convert(&mut h, &no_decay());
        assert_eq!(h.intensity.get(0, 0), MAX_SURGE_M);
    }

    #[test]
    fn beyond_inland_limit_is_zero() {
        let params = SurgeParams { decay_rate_m_per_km: 0.0, ..SurgeParams::default() };
        let mut h = hazard(&[80.0, 80.0, 80.0], &[0.0, 0.0, 0.0], Some(vec![-5.0, 49.0, 51.0]));
        convert(&mut h, &params);
        assert!(h.intensity.get(0, 0) > 0.0);
        assert!(h.intensity.get(0, 1) > 0.0);
        assert_eq!(h.intensity.get(0, 2), 0.0);
    }

    #[test]
    fn inland_decay_reduces_surge() {
        // 8 km inland, 3 km buffer: 1 m of decay.
        let mut a = hazard(&[40.0], &[0.5], None);
        let mut b = hazard(&[40.0], &[0.5], Some(vec![8.0]));
        convert(&mut a, &SurgeParams::default());
        convert(&mut b, &SurgeParams::default());
        assert_abs_diff_eq!(a.intensity.get(0, 0) - b.intensity.get(0, 0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn larger_buffer_never_reduces_surge() {
        let mut rng = StdRng::seed_from_u64(11);
        let n_loc = 12;
        let dense: Vec<f64> = (0..3 * n_loc).map(|_| rng.gen_range(20.0..70.0)).collect();
        let elevation: Vec<f64> = (0..n_loc).map(|_| rng.gen_range(0.0..4.0)).collect();
        let dist: Vec<f64> = (0..n_loc).map(|_| rng.gen_range(-10.0..45.0)).collect();

        let mut previous: Option<HazardFootprintSet> = None;
        for buffer in [0.0, 1.0, 3.0, 6.0, 12.0] {
            let params = SurgeParams { decay_buffer_km: buffer, ..SurgeParams::default() };
            let mut h = hazard(&dense, &elevation, Some(dist.clone()));
            convert(&mut h, &params);
            if let Some(prev) = &previous {
                for ev in 0..3 {
                    for loc in 0..n_loc {
                        assert!(h.intensity.get(ev, loc) >= prev.intensity.get(ev, loc));
                    }
                }
            }
            previous = Some(h);
        }
    }

    #[test]
    fn second_conversion_is_rejected() {
        let mut h = hazard(&[40.0], &[0.0], None);
        convert(&mut h, &no_decay());
        let before = h.intensity.clone();
        let err = generate_surge(&mut h, &AttachedElevation::PerLocation, &no_decay(), &RunSettings::default())
            .unwrap_err();
        assert!(matches!(err, SurgeError::AlreadyConverted(_)));
        assert_eq!(h.intensity, before);
    }

    #[test]
    fn missing_elevation_is_an_error() {
        let mut h = hazard(&[40.0], &[0.0], None);
        h.elevation = None;
        let err = generate_surge(&mut h, &AttachedElevation::PerLocation, &no_decay(), &RunSettings::default())
            .unwrap_err();
        assert!(matches!(err, SurgeError::MissingElevation));
        assert_eq!(h.peril_id, crate::hazard::WIND_PERIL);
    }

    #[test]
    fn fraction_defaults_to_one_on_surge_pattern() {
        let mut h = hazard(&[30.0, 0.0, 28.0, 40.0], &[0.0, 5.0], None);
        convert(&mut h, &no_decay());
        let fraction = h.fraction.as_ref().unwrap();
        assert!(fraction.same_pattern(&h.intensity));
        assert!(fraction.data.iter().all(|&f| f == 1.0));
    }

    #[test]
    fn given_fraction_is_carried_through() {
        let mut h = hazard(&[30.0, 35.0], &[0.0, 0.0], None);
        h.fraction = Some(CsrMatrix::from_dense(1, 2, &[0.25, 0.0]).unwrap());
        convert(&mut h, &no_decay());
        let fraction = h.fraction.as_ref().unwrap();
        assert_eq!(fraction.get(0, 0), 0.25);
        assert_eq!(fraction.get(0, 1), 1.0);
    }

    #[test]
    fn summary_reports_fields_and_density() {
        let mut h = hazard(&[30.0, 0.0, 40.0, 40.0], &[0.0, 20.0], None);
        let s = convert(&mut h, &no_decay());
        assert_eq!(s.events, 2);
        assert_eq!(s.locations, 2);
        assert_eq!(s.stored_fields, 2);
        assert_abs_diff_eq!(s.density, 0.5);
        assert_eq!(s.strategy, SurgeStrategy::Coarse(IterationOrder::ByEvent));
    }

    #[test]
    fn fine_strategy_end_to_end() {
        // Location 0: samples at 0.5 and 3 m. Location 1: sea, no samples.
        let fine = FineElevation {
            samples: SampleGrid {
                lon: vec![-80.0, -80.0],
                lat: vec![25.0, 25.0],
                height: vec![0.5, 3.0],
            },
            sample_to_location: vec![Some(0), Some(0)],
            location_elevation: vec![1.75, -2.0],
        };
        let mut h = hazard(&[20.0, 20.0], &[1.75, -2.0], None);
        h.elevation = Some(fine.location_elevation.clone());
        let s = generate_surge(
            &mut h,
            &AttachedElevation::Fine(fine),
            &no_decay(),
            &RunSettings::default(),
        )
        .unwrap();
        assert_eq!(s.strategy, SurgeStrategy::Fine);
        assert_eq!(s.fine_locations, 1);
        // Surge 1.8288 m floods only the 0.5 m sample.
        assert_abs_diff_eq!(h.intensity.get(0, 0), 1.8288 - 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(h.fraction.as_ref().unwrap().get(0, 0), 0.5);
        // Offshore location keeps the raw surge.
        assert_abs_diff_eq!(h.intensity.get(0, 1), 1.8288, epsilon = 1e-12);
    }

    #[test]
    fn fine_elevation_for_other_locations_is_rejected() {
        let fine = FineElevation {
            samples: SampleGrid::default(),
            sample_to_location: Vec::new(),
            location_elevation: vec![1.0],
        };
        let mut h = hazard(&[30.0, 30.0], &[1.0, 1.0], None);
        let err = generate_surge(&mut h, &AttachedElevation::Fine(fine), &no_decay(), &RunSettings::default())
            .unwrap_err();
        assert!(matches!(err, SurgeError::ShapeMismatch { .. }));
    }

    #[test]
    fn fine_strategy_zeroes_high_ground_for_every_event() {
        // Location 0 sits at 12 m but its samples are low; location 1 floods.
        let fine = FineElevation {
            samples: SampleGrid {
                lon: vec![-80.0; 4],
                lat: vec![25.0; 4],
                height: vec![0.5, 1.0, 0.5, 3.0],
            },
            sample_to_location: vec![Some(0), Some(0), Some(1), Some(1)],
            location_elevation: vec![12.0, 1.75],
        };
        let mut h = hazard(&[40.0, 40.0, 60.0, 60.0, 90.0, 90.0], &fine.location_elevation, None);
        let s = generate_surge(&mut h, &AttachedElevation::Fine(fine), &no_decay(), &RunSettings::default()).unwrap();
        assert_eq!(s.fine_locations, 1);
        for ev in 0..3 {
            assert_eq!(h.intensity.get(ev, 0), 0.0);
            assert!(h.intensity.get(ev, 1) > 0.0);
        }
    }

    #[test]
    fn malformed_fraction_is_an_error_not_a_panic() {
        let mut h = hazard(&[30.0; 6], &[0.0, 0.0], None);
        h.fraction = Some(CsrMatrix {
            n_rows: 3,
            n_cols: 2,
            indptr: vec![0, 2, 1, 3],
            indices: vec![0, 1, 0],
            data: vec![0.5; 3],
        });
        let err = generate_surge(&mut h, &AttachedElevation::PerLocation, &no_decay(), &RunSettings::default())
            .unwrap_err();
        assert!(matches!(err, SurgeError::MalformedMatrix(_)));
        assert_eq!(h.peril_id, crate::hazard::WIND_PERIL);
    }

    #[test]
    fn fine_samples_pointing_past_the_locations_are_rejected() {
        let fine = FineElevation {
            samples: SampleGrid { lon: vec![-80.0], lat: vec![25.0], height: vec![0.5] },
            sample_to_location: vec![Some(5)],
            location_elevation: vec![1.0],
        };
        let mut h = hazard(&[30.0], &[1.0], None);
        assert!(generate_surge(&mut h, &AttachedElevation::Fine(fine), &no_decay(), &RunSettings::default()).is_err());
    }
}
