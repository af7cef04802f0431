//! Closed-form fits of the post-landfall decay curves.
//!
//! Relative central pressure:  y(x) = S − (S − 1)·exp(−A·x)
//! Relative wind speed:        v(x) = exp(−L·x)
//!
//! with x in hours since the last sea point. Each sample gives its own A (or
//! L) by inverting the curve; a category's parameter is the sample mean.
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, SurgeError};

use super::category::{nearest_valid, CATEGORY_NAMES, N_CATEGORIES};

/// Samples collected for one category.
#[derive(Debug, Clone, Default)]
pub struct BucketSamples {
    /// Asymptotic pressure ratio of the segment each sample came from.
    pub s: Vec<f64>,
    /// Central pressure relative to the reference point.
    pub p_rel: Vec<f64>,
    /// Hours since the reference point, one per pressure sample.
    pub x: Vec<f64>,
    /// Wind relative to the reference point, paired with `x_wind`.
    pub v_rel: Vec<f64>,
    pub x_wind: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayParameters {
    /// A (1/h).
    pub rate: f64,
    /// S, the pressure ratio approached far inland.
    pub ratio: f64,
}

/// Pressure decay parameters per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayParameterTable {
    pub rows: [DecayParameters; N_CATEGORIES],
    /// Category whose parameters were copied, for rows without samples.
    pub borrowed_from: [Option<usize>; N_CATEGORIES],
}

impl DecayParameterTable {
    /// Central pressure relative to landfall, `hours` after landfall.
    pub fn relative_pressure(&self, category: usize, hours: f64) -> f64 {
        let DecayParameters { rate, ratio } = self.rows[category];
        ratio - (ratio - 1.0) * (-rate * hours).exp()
    }
}

/// Wind decay rate L (1/h) per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindDecayTable {
    pub rates: [f64; N_CATEGORIES],
    pub borrowed_from: [Option<usize>; N_CATEGORIES],
}

impl WindDecayTable {
    /// Wind relative to landfall, `hours` after landfall.
    pub fn relative_wind(&self, category: usize, hours: f64) -> f64 {
        (-self.rates[category] * hours).exp()
    }
}

/// Mean A and S over the valid samples, None when there are none.
///
/// Samples with S ≤ 1, S − y ≤ 0 or x ≤ 0 have no real solution and are
/// skipped.
pub fn fit_relative_pressure(s: &[f64], y: &[f64], x: &[f64]) -> Option<DecayParameters> {
    let (mut a_sum, mut s_sum, mut n) = (0.0, 0.0, 0usize);
    for ((&s, &y), &x) in s.iter().zip(y).zip(x) {
        if !(s > 1.0 && s - y > 0.0 && x > 0.0) {
            continue;
        }
        let a = ((s - 1.0) / (s - y)).ln() / x;
        if a.is_finite() {
            a_sum += a;
            s_sum += s;
            n += 1;
        }
    }
    (n > 0).then(|| DecayParameters {
        rate: a_sum / n as f64,
        ratio: s_sum / n as f64,
    })
}

/// Mean L over samples with v > 0 and x > 0.
pub fn fit_relative_wind(v: &[f64], x: &[f64]) -> Option<f64> {
    let rates: Vec<f64> = v
        .iter()
        .zip(x)
        .filter(|&(&v, &x)| v > 0.0 && x > 0.0)
        .map(|(&v, &x)| -v.ln() / x)
        .filter(|l| l.is_finite())
        .collect();
    (!rates.is_empty()).then(|| rates.iter().sum::<f64>() / rates.len() as f64)
}

/// Fill empty categories from their nearest fitted neighbour. Errors when no
/// category has a fit.
fn fill_from_nearest<T: Copy>(
    fitted: [Option<T>; N_CATEGORIES],
    quantity: &str,
) -> Result<([T; N_CATEGORIES], [Option<usize>; N_CATEGORIES])> {
    let valid: Vec<bool> = fitted.iter().map(Option::is_some).collect();
    let mut borrowed = [None; N_CATEGORIES];
    let mut rows = Vec::with_capacity(N_CATEGORIES);
    for cat in 0..N_CATEGORIES {
        let src = nearest_valid(cat, &valid).ok_or(SurgeError::NoDecaySamples)?;
        if src != cat {
            warn!(
                category = CATEGORY_NAMES[cat],
                from = CATEGORY_NAMES[src],
                "no {quantity} decay samples; borrowing parameters"
            );
            borrowed[cat] = Some(src);
        }
        if let Some(v) = fitted[src] {
            rows.push(v);
        }
    }
    let rows: [T; N_CATEGORIES] = rows.try_into().map_err(|_| SurgeError::NoDecaySamples)?;
    Ok((rows, borrowed))
}

pub fn fit_pressure_table(buckets: &[BucketSamples; N_CATEGORIES]) -> Result<DecayParameterTable> {
    let fitted = std::array::from_fn(|c| fit_relative_pressure(&buckets[c].s, &buckets[c].p_rel, &buckets[c].x));
    let (rows, borrowed_from) = fill_from_nearest(fitted, "pressure")?;
    Ok(DecayParameterTable { rows, borrowed_from })
}

/// None when no category has usable wind samples.
pub fn fit_wind_table(buckets: &[BucketSamples; N_CATEGORIES]) -> Option<WindDecayTable> {
    let fitted = std::array::from_fn(|c| fit_relative_wind(&buckets[c].v_rel, &buckets[c].x_wind));
    fill_from_nearest(fitted, "wind")
        .ok()
        .map(|(rates, borrowed_from)| WindDecayTable { rates, borrowed_from })
}
