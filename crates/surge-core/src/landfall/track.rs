//! Cyclone track time series.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub time: DateTime<Utc>,
    pub lon: f64,
    pub lat: f64,
    /// Central pressure (hPa).
    pub central_pressure_hpa: f64,
    /// Environmental (ambient) pressure (hPa).
    pub environmental_pressure_hpa: f64,
    /// Maximum sustained wind (kn).
    pub max_sustained_wind_kn: f64,
    #[serde(default)]
    pub on_land: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    /// Observed track, as opposed to a synthetic one generated from it.
    #[serde(default = "default_historical")]
    pub historical: bool,
    pub points: Vec<TrackPoint>,
}

fn default_historical() -> bool {
    true
}

/// A stretch over land: from the first land point up to, not including, the
/// next sea point (or the end of the track).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LandSegment {
    /// First point on land. Always ≥ 1: the point before it is at sea.
    pub landfall: usize,
    /// First point back at sea, or the track length.
    pub sea_return: usize,
}

impl LandSegment {
    /// Last sea point before landfall; the reference for relative values.
    pub fn reference(&self) -> usize {
        self.landfall - 1
    }
}

impl Track {
    /// Every sea → land transition with its matching return to sea. A track
    /// that starts on land has no landfall for that first stretch.
    pub fn land_segments(&self) -> Vec<LandSegment> {
        let on_land: Vec<bool> = self.points.iter().map(|p| p.on_land).collect();
        let mut segments = Vec::new();
        let mut i = 1;
        while i < on_land.len() {
            if on_land[i] && !on_land[i - 1] {
                let sea_return = (i + 1..on_land.len())
                    .find(|&j| !on_land[j])
                    .unwrap_or(on_land.len());
                segments.push(LandSegment { landfall: i, sea_return });
                i = sea_return;
            } else {
                i += 1;
            }
        }
        segments
    }

    /// Hours from point `from` to point `to`.
    pub fn hours_between(&self, from: usize, to: usize) -> f64 {
        (self.points[to].time - self.points[from].time).num_seconds() as f64 / 3600.0
    }
}
