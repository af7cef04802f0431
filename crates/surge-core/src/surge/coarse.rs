//! Direct elevation subtraction for per-location elevation.
use serde::Serialize;

use crate::sparse::CsrMatrix;

/// Traversal order over the stored entries. Both orders give identical
/// results; walking the shorter dimension keeps per-row setup low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationOrder {
    ByEvent,
    ByLocation,
}

impl IterationOrder {
    pub fn for_shape(n_events: usize, n_locations: usize) -> Self {
        if n_locations < n_events {
            IterationOrder::ByLocation
        } else {
            IterationOrder::ByEvent
        }
    }
}

/// `v = max(v - offset[location], 0)` over stored entries of an
/// event × location matrix.
pub fn subtract_offsets(intensity: &mut CsrMatrix, offset: &[f64], order: IterationOrder) {
    match order {
        IterationOrder::ByEvent => {
            intensity.map_stored(|_, loc, v| (v - offset[loc]).max(0.0));
        }
        IterationOrder::ByLocation => {
            let mut by_loc = intensity.transpose();
            for row in by_loc.rows_mut() {
                let off = offset[row.row];
                for v in row.values.iter_mut() {
                    *v = (*v - off).max(0.0);
                }
            }
            *intensity = by_loc.transpose();
        }
    }
}

/// Offset per location: ground height (floored at zero) plus the precision
/// margin plus inland decay.
pub fn location_offsets(elevation: &[f64], decay_m: &[f64], precision_margin_m: f64) -> Vec<f64> {
    elevation
        .iter()
        .zip(decay_m)
        .map(|(&h, &d)| h.max(0.0) + precision_margin_m + d)
        .collect()
}
