//! Assignment of fine elevation samples to hazard locations.
//!
//! The [`Regridder`] trait is the seam for an external regridding service;
//! [`NearestRegridder`] is the built-in nearest-location implementation.
use crate::coords::LatLon;
use crate::error::Result;

use super::fine::SampleGrid;

/// Output of a regridding call.
#[derive(Debug, Clone, PartialEq)]
pub struct Regridded {
    /// One value per target: mean height of the samples assigned to it, NaN
    /// when none were.
    pub target_values: Vec<f64>,
    /// One entry per source sample: the target it belongs to, if any.
    pub sample_to_target: Vec<Option<usize>>,
}

pub trait Regridder {
    /// Map every sample of `source` to a target in `targets`. A sample may only
    /// go to target `t` if it lies within `max_distance[t]` degrees of it.
    fn regrid(&self, source: &SampleGrid, targets: &[LatLon], max_distance: &[f64]) -> Result<Regridded>;
}

/// Assigns each sample to the nearest target whose radius contains it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestRegridder;

impl Regridder for NearestRegridder {
    fn regrid(&self, source: &SampleGrid, targets: &[LatLon], max_distance: &[f64]) -> Result<Regridded> {
        let order = lon_order(targets);
        let sorted_lons: Vec<f64> = order.iter().map(|&i| targets[i].lon).collect();
        let reach = max_distance.iter().cloned().fold(0.0f64, f64::max);

        let mut sample_to_target = Vec::with_capacity(source.len());
        let mut sums = vec![0f64; targets.len()];
        let mut counts = vec![0usize; targets.len()];

        for s in 0..source.len() {
            let p = LatLon::new(source.lat[s], source.lon[s]);
            let start = sorted_lons.partition_point(|&lon| lon < p.lon);
            let mut best: Option<(usize, f64)> = None;

            let mut consider = |t: usize| -> bool {
                let dlon = (targets[t].lon - p.lon).abs();
                let bound = best.map_or(reach, |(_, d)| d.min(reach));
                if dlon > bound {
                    return false;
                }
                let d = p.deg_distance(targets[t]);
                if d <= max_distance[t] && best.map_or(true, |(_, bd)| d < bd) {
                    best = Some((t, d));
                }
                true
            };
            for &t in &order[start..] {
                if !consider(t) {
                    break;
                }
            }
            for &t in order[..start].iter().rev() {
                if !consider(t) {
                    break;
                }
            }

            if let Some((t, _)) = best {
                sums[t] += source.height[s] as f64;
                counts[t] += 1;
            }
            sample_to_target.push(best.map(|(t, _)| t));
        }

        let target_values = sums
            .iter()
            .zip(&counts)
            .map(|(&sum, &n)| if n > 0 { sum / n as f64 } else { f64::NAN })
            .collect();
        Ok(Regridded { target_values, sample_to_target })
    }
}

/// Half the distance (degrees) from each point to its nearest neighbour.
/// A lone point gets an unbounded radius.
pub fn half_nearest_distances(points: &[LatLon]) -> Vec<f64> {
    let order = lon_order(points);
    let mut out = vec![f64::INFINITY; points.len()];
    for (pos, &i) in order.iter().enumerate() {
        let mut best = f64::INFINITY;
        for &j in &order[pos + 1..] {
            if points[j].lon - points[i].lon >= best {
                break;
            }
            best = best.min(points[i].deg_distance(points[j]));
        }
        for &j in order[..pos].iter().rev() {
            if points[i].lon - points[j].lon >= best {
                break;
            }
            best = best.min(points[i].deg_distance(points[j]));
        }
        out[i] = best / 2.0;
    }
    out
}

fn lon_order(points: &[LatLon]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| points[a].lon.total_cmp(&points[b].lon));
    order
}
