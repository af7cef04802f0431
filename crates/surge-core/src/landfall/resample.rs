//! Collaborators the decay fit runs tracks through before fitting: a uniform
//! time step and on-land flags.
use chrono::Duration;

use crate::error::Result;
use crate::heightfield::HeightField;

use super::track::{Track, TrackPoint};

pub trait Resampler {
    /// Tracks resampled to a uniform `step_h`-hour time step.
    fn resample(&self, tracks: &[Track], step_h: f64) -> Vec<Track>;
}

pub trait LandAnnotator {
    /// Set `on_land` on every point.
    fn annotate(&self, tracks: &mut [Track]) -> Result<()>;
}

/// Linear interpolation between observations; the on-land flag is taken from
/// the preceding observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearResampler;

impl Resampler for LinearResampler {
    fn resample(&self, tracks: &[Track], step_h: f64) -> Vec<Track> {
        tracks.iter().map(|t| resample_track(t, step_h)).collect()
    }
}

fn resample_track(track: &Track, step_h: f64) -> Track {
    let pts = &track.points;
    // Non-finite, non-positive or sub-millisecond steps leave the track as is.
    let step = (step_h.is_finite() && step_h > 0.0)
        .then(|| (step_h * 3_600_000.0).round())
        .filter(|&ms| ms >= 1.0 && ms < i64::MAX as f64)
        .and_then(|ms| Duration::try_milliseconds(ms as i64));
    let Some(step) = step.filter(|_| pts.len() >= 2) else {
        return track.clone();
    };
    let (first, last) = (pts[0].time, pts[pts.len() - 1].time);

    let mut out = Vec::new();
    let mut seg = 0;
    let mut t = first;
    while t <= last {
        while seg + 2 < pts.len() && pts[seg + 1].time <= t {
            seg += 1;
        }
        let (a, b) = (&pts[seg], &pts[seg + 1]);
        let span = (b.time - a.time).num_milliseconds() as f64;
        let w = if span > 0.0 {
            ((t - a.time).num_milliseconds() as f64 / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let lerp = |x: f64, y: f64| x + (y - x) * w;
        out.push(TrackPoint {
            time: t,
            lon: lerp(a.lon, b.lon),
            lat: lerp(a.lat, b.lat),
            central_pressure_hpa: lerp(a.central_pressure_hpa, b.central_pressure_hpa),
            environmental_pressure_hpa: lerp(a.environmental_pressure_hpa, b.environmental_pressure_hpa),
            max_sustained_wind_kn: lerp(a.max_sustained_wind_kn, b.max_sustained_wind_kn),
            on_land: if w >= 1.0 { b.on_land } else { a.on_land },
        });
        match t.checked_add_signed(step) {
            Some(next) => t = next,
            None => break,
        }
    }

    Track {
        name: track.name.clone(),
        historical: track.historical,
        points: out,
    }
}

/// Leaves the flags already on the points.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepLandFlags;

impl LandAnnotator for KeepLandFlags {
    fn annotate(&self, _tracks: &mut [Track]) -> Result<()> {
        Ok(())
    }
}

/// Land where the raster is above sea level; sea outside the raster.
impl LandAnnotator for HeightField {
    fn annotate(&self, tracks: &mut [Track]) -> Result<()> {
        self.validate()?;
        for p in tracks.iter_mut().flat_map(|t| t.points.iter_mut()) {
            p.on_land = self.sample(p.lon, p.lat).is_some_and(|h| h > 0.0);
        }
        Ok(())
    }
}
