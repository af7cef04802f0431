//! Post-landfall decay of historical cyclones, fitted per wind category.
pub mod category;
pub mod fit;
pub mod resample;
pub mod track;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::DecayFitParams;
use crate::error::Result;

use category::{category_for_wind, N_CATEGORIES};
use fit::{fit_pressure_table, fit_wind_table, BucketSamples, DecayParameterTable, WindDecayTable};
use resample::{LandAnnotator, Resampler};
use track::{LandSegment, Track};

/// Environmental pressure floor for the asymptote numerator (hPa).
const ENV_PRESSURE_FLOOR_HPA: f64 = 1010.0;
/// Cap on the landfall pressure in the asymptote denominator (hPa).
const LANDFALL_PRESSURE_CAP_HPA: f64 = 1009.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayFit {
    pub pressure: DecayParameterTable,
    /// Absent when no category had usable wind samples.
    pub wind: Option<WindDecayTable>,
    /// Landfall segments that fell into each category.
    pub segments: [usize; N_CATEGORIES],
}

/// Fit pressure (and wind) decay parameters from the historical tracks.
///
/// Non-historical tracks are ignored with a warning. Fails only when no
/// category ends up with a single valid pressure sample.
pub fn fit_landfall_decay(
    tracks: &[Track],
    params: &DecayFitParams,
    resampler: &dyn Resampler,
    annotator: &dyn LandAnnotator,
) -> Result<DecayFit> {
    let synthetic = tracks.iter().filter(|t| !t.historical).count();
    if synthetic > 0 {
        let per_original = params.synthetic_per_original;
        warn!(
            synthetic,
            per_original,
            estimated_originals = tracks.len() / (1 + per_original),
            "input contains non-historical tracks; fitting only the historical ones"
        );
    }
    let historical: Vec<Track> = tracks.iter().filter(|t| t.historical).cloned().collect();

    let mut resampled = resampler.resample(&historical, params.time_step_h);
    annotator.annotate(&mut resampled)?;

    let mut buckets: [BucketSamples; N_CATEGORIES] = Default::default();
    let mut segments = [0usize; N_CATEGORIES];
    for track in &resampled {
        for seg in track.land_segments() {
            let cat = category_for_wind(track.points[seg.reference()].max_sustained_wind_kn);
            collect_segment(track, seg, params.normalize_to_environment, &mut buckets[cat]);
            segments[cat] += 1;
        }
    }
    info!(tracks = resampled.len(), landfalls = segments.iter().sum::<usize>(), "collected landfall segments");
    debug!(?segments, "segments per category");

    let pressure = fit_pressure_table(&buckets)?;
    let wind = fit_wind_table(&buckets);
    Ok(DecayFit { pressure, wind, segments })
}

/// Relative pressure and wind over one segment, against the last sea point.
fn collect_segment(track: &Track, seg: LandSegment, normalize: bool, bucket: &mut BucketSamples) {
    let pts = &track.points;
    let r = seg.reference();
    let end = seg.sea_return - 1;
    let p_ref = pts[r].central_pressure_hpa;
    let v_ref = pts[r].max_sustained_wind_kn;

    let s = if normalize {
        pts[end].environmental_pressure_hpa.max(ENV_PRESSURE_FLOOR_HPA) / p_ref.min(LANDFALL_PRESSURE_CAP_HPA)
    } else {
        pts[end].central_pressure_hpa / p_ref
    };

    for i in seg.landfall..seg.sea_return {
        let x = track.hours_between(r, i);
        if x <= 0.0 {
            continue;
        }
        let y = pts[i].central_pressure_hpa / p_ref;
        if y.is_finite() {
            bucket.s.push(s);
            bucket.p_rel.push(y);
            bucket.x.push(x);
        }
        let v = pts[i].max_sustained_wind_kn / v_ref;
        if v.is_finite() {
            bucket.v_rel.push(v);
            bucket.x_wind.push(x);
        }
    }
}
