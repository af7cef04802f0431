//! Wind speed → surge height.
//!
//! Two-point linear fit through 60 mph → 6 ft and 140 mph → 18 ft, in SI
//! units, anchored at the lower breakpoint. Below the breakpoint the surge is
//! the constant offset.

/// 60 mph in m/s.
pub const WIND_BREAKPOINT_MS: f64 = 26.8224;
/// Surge gained per m/s above the breakpoint (m per m/s).
pub const SURGE_SLOPE: f64 = 0.1023;
/// 6 ft in metres: the surge at and below the breakpoint.
pub const SURGE_OFFSET_M: f64 = 1.8288;

/// Surge height (m) for a wind speed (m/s), plus sea level rise.
#[inline]
pub fn wind_to_surge(wind_ms: f64, slr_increment_m: f64) -> f64 {
    SURGE_SLOPE * (wind_ms - WIND_BREAKPOINT_MS).max(0.0) + SURGE_OFFSET_M + slr_increment_m
}
