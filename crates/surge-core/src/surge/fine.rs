//! Sub-sample averaging for fine elevation.
//!
//! Each eligible location compares every event's surge with each fine sample
//! assigned to it. The location's surge becomes the mean depth over the
//! flooded samples and its fraction the share of samples flooded. Locations
//! are independent, so the loop can run on the rayon pool.
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "threading")]
use rayon::prelude::*;
use tracing::{debug, info};

use crate::elevation::fine::FineElevation;
use crate::sparse::{CsrMatrix, RowMut};

use super::inland::InlandDecay;
use super::MAX_ELEVATION_M;

/// Read-only inputs shared by every location task.
struct LocationInputs<'a> {
    fine: &'a FineElevation,
    groups: Vec<Vec<usize>>,
    elevation: &'a [f64],
    inland: &'a InlandDecay,
}

impl LocationInputs<'_> {
    fn eligible(&self, loc: usize) -> bool {
        let h = self.elevation[loc];
        h > 0.0 && h < MAX_ELEVATION_M && !self.inland.beyond_limit[loc] && !self.groups[loc].is_empty()
    }

    fn heights(&self, loc: usize) -> impl Iterator<Item = f64> + '_ {
        self.groups[loc].iter().map(|&s| self.fine.samples.height[s] as f64)
    }
}

/// Apply sub-sample averaging to `intensity` and `fraction`, which share one
/// sparsity pattern (event × location). Returns the number of locations
/// processed.
pub fn apply_fine(
    intensity: &mut CsrMatrix,
    fraction: &mut CsrMatrix,
    fine: &FineElevation,
    elevation: &[f64],
    inland: &InlandDecay,
    parallel: bool,
) -> usize {
    debug_assert!(intensity.same_pattern(fraction));
    let inputs = LocationInputs {
        fine,
        groups: fine.samples_by_location(),
        elevation,
        inland,
    };

    let mut int_by_loc = intensity.transpose();
    let mut frac_by_loc = fraction.transpose();
    let tasks: Vec<(RowMut<'_>, RowMut<'_>)> = int_by_loc
        .rows_mut()
        .into_iter()
        .zip(frac_by_loc.rows_mut())
        .filter(|(row, _)| !row.values.is_empty() && inputs.eligible(row.row))
        .collect();

    let total = tasks.len();
    let step = (total / 10).max(1);
    let done = AtomicUsize::new(0);
    let run = |(int_row, frac_row): (RowMut<'_>, RowMut<'_>)| {
        let loc = int_row.row;
        average_over_samples(int_row.values, frac_row.values, &inputs, loc);
        let n = done.fetch_add(1, Ordering::Relaxed) + 1;
        if n % step == 0 {
            info!(done = n, total, "fine elevation locations processed");
        }
    };

    if parallel {
        run_parallel(tasks, run);
    } else {
        tasks.into_iter().for_each(run);
    }

    *intensity = int_by_loc.transpose();
    *fraction = frac_by_loc.transpose();
    total
}

#[cfg(feature = "threading")]
fn run_parallel<'a, F>(tasks: Vec<(RowMut<'a>, RowMut<'a>)>, run: F)
where
    F: Fn((RowMut<'a>, RowMut<'a>)) + Sync + Send,
{
    debug!(tasks = tasks.len(), "running fine elevation loop on the rayon pool");
    tasks.into_par_iter().for_each(run);
}

#[cfg(not(feature = "threading"))]
fn run_parallel<'a, F>(tasks: Vec<(RowMut<'a>, RowMut<'a>)>, run: F)
where
    F: Fn((RowMut<'a>, RowMut<'a>)),
{
    debug!("built without the threading feature; running fine elevation loop serially");
    tasks.into_iter().for_each(run);
}

/// One location: every stored event value is replaced by the mean flood depth
/// over the location's samples, less inland decay.
fn average_over_samples(values: &mut [f64], fractions: &mut [f64], inputs: &LocationInputs<'_>, loc: usize) {
    let n_samples = inputs.groups[loc].len() as f64;
    let decay = inputs.inland.decay_m[loc];
    for (v, f) in values.iter_mut().zip(fractions.iter_mut()) {
        if *v == 0.0 {
            continue;
        }
        let (depth_sum, flooded) = inputs.heights(loc).fold((0.0f64, 0usize), |(sum, n), h| {
            let depth = *v - h;
            if depth > 0.0 {
                (sum + depth, n + 1)
            } else {
                (sum, n)
            }
        });
        let mean = if flooded > 0 { depth_sum / flooded as f64 } else { 0.0 };
        *f = flooded as f64 / n_samples;
        *v = (mean - decay).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SurgeParams;
    use crate::elevation::fine::SampleGrid;
    use approx::assert_relative_eq;

    /// Two locations, four samples each; location 1 has heights 11–14 m.
    fn fine() -> FineElevation {
        FineElevation {
            samples: SampleGrid {
                lon: vec![0.0; 8],
                lat: vec![0.0; 8],
                height: vec![0.5, 1.0, 2.0, 4.0, 11.0, 12.0, 13.0, 14.0],
            },
            sample_to_location: vec![Some(0), Some(0), Some(0), Some(0), Some(1), Some(1), Some(1), Some(1)],
            location_elevation: vec![1.875, 12.5],
        }
    }

    fn run(dense: &[f64], dist: Option<&[f64]>, parallel: bool) -> (CsrMatrix, CsrMatrix, usize) {
        let fine = fine();
        let mut intensity = CsrMatrix::from_dense(dense.len() / 2, 2, dense).unwrap();
        let mut fraction = intensity.with_pattern_value(1.0);
        let inland = InlandDecay::new(dist, 2, &SurgeParams::default());
        let n = apply_fine(
            &mut intensity,
            &mut fraction,
            &fine,
            &fine.location_elevation.clone(),
            &inland,
            parallel,
        );
        (intensity, fraction, n)
    }

    #[test]
    fn mean_depth_over_flooded_samples() {
        // Surge 3 m: flooded samples 0.5, 1.0, 2.0 → depths 2.5, 2.0, 1.0.
        let (i, f, n) = run(&[3.0, 5.0], None, false);
        assert_eq!(n, 1);
        assert_relative_eq!(i.get(0, 0), 5.5 / 3.0);
        assert_relative_eq!(f.get(0, 0), 0.75);
        // Location 1 is above the fine elevation cap and left alone here.
        assert_eq!(i.get(0, 1), 5.0);
        assert_eq!(f.get(0, 1), 1.0);
    }

    #[test]
    fn no_flooded_sample_gives_zero() {
        let (i, f, _) = run(&[0.4, 0.0], None, false);
        assert_eq!(i.get(0, 0), 0.0);
        assert_eq!(f.get(0, 0), 0.0);
    }

    #[test]
    fn decay_is_subtracted_after_averaging() {
        // 8 km inland: decay (8 - 3) × 0.2 = 1 m.
        let (i, f, _) = run(&[3.0, 0.0], Some(&[8.0, 0.0]), false);
        assert_relative_eq!(i.get(0, 0), 5.5 / 3.0 - 1.0);
        assert_relative_eq!(f.get(0, 0), 0.75);
    }

    #[test]
    fn location_beyond_limit_is_skipped() {
        let (i, _, n) = run(&[3.0, 0.0], Some(&[60.0, 0.0]), false);
        assert_eq!(n, 0);
        assert_eq!(i.get(0, 0), 3.0);
    }

    #[test]
    fn parallel_flag_gives_same_result() {
        let dense = [3.0, 5.0, 1.5, 0.0, 4.5, 2.0];
        assert_eq!(run(&dense, None, false), run(&dense, None, true));
    }

    #[cfg(feature = "threading")]
    #[test]
    fn rayon_pool_matches_serial_loop() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(23);
        let (n_loc, per_loc, n_events) = (300, 6, 40);
        let height: Vec<f32> = (0..n_loc * per_loc).map(|_| rng.gen_range(0.1..9.0)).collect();
        let location_elevation: Vec<f64> = height
            .chunks(per_loc)
            .map(|c| c.iter().map(|&h| h as f64).sum::<f64>() / per_loc as f64)
            .collect();
        let fine = FineElevation {
            samples: SampleGrid {
                lon: vec![0.0; height.len()],
                lat: vec![0.0; height.len()],
                height,
            },
            sample_to_location: (0..n_loc * per_loc).map(|s| Some(s / per_loc)).collect(),
            location_elevation,
        };
        let dense: Vec<f64> = (0..n_events * n_loc)
            .map(|_| if rng.gen_bool(0.5) { rng.gen_range(0.5..8.0) } else { 0.0 })
            .collect();
        let dist: Vec<f64> = (0..n_loc).map(|_| rng.gen_range(-5.0..60.0)).collect();
        let inland = InlandDecay::new(Some(&dist), n_loc, &SurgeParams::default());

        let go = |parallel: bool| {
            let mut intensity = CsrMatrix::from_dense(n_events, n_loc, &dense).unwrap();
            let mut fraction = intensity.with_pattern_value(1.0);
            let n = apply_fine(&mut intensity, &mut fraction, &fine, &fine.location_elevation, &inland, parallel);
            (intensity, fraction, n)
        };
        let serial = go(false);
        assert!(serial.2 > 0);
        assert_eq!(serial, go(true));
    }
}
