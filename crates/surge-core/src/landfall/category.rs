//! Saffir-Simpson style wind categories used to bucket landfalls.

/// Tropical depression, tropical storm, hurricane categories 1–5.
pub const N_CATEGORIES: usize = 7;

/// Upper bound (exclusive, kn) of each category.
pub const CATEGORY_UPPER_KN: [f64; N_CATEGORIES] = [34.0, 64.0, 83.0, 96.0, 113.0, 135.0, f64::INFINITY];

pub const CATEGORY_NAMES: [&str; N_CATEGORIES] = [
    "tropical depression",
    "tropical storm",
    "category 1",
    "category 2",
    "category 3",
    "category 4",
    "category 5",
];

/// Category index for a maximum sustained wind in knots. Missing (NaN) wind
/// counts as a tropical depression.
pub fn category_for_wind(wind_kn: f64) -> usize {
    if wind_kn.is_nan() {
        return 0;
    }
    CATEGORY_UPPER_KN
        .iter()
        .position(|&upper| wind_kn < upper)
        .unwrap_or(N_CATEGORIES - 1)
}

/// Closest index to `idx` whose flag is set, the lower one on ties.
pub fn nearest_valid(idx: usize, valid: &[bool]) -> Option<usize> {
    if valid.get(idx).copied().unwrap_or(false) {
        return Some(idx);
    }
    (1..valid.len()).find_map(|d| {
        let below = idx.checked_sub(d).filter(|&i| valid[i]);
        let above = Some(idx + d).filter(|&i| i < valid.len() && valid[i]);
        below.or(above)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_split_categories() {
        assert_eq!(category_for_wind(20.0), 0);
        assert_eq!(category_for_wind(34.0), 1);
        assert_eq!(category_for_wind(63.9), 1);
        assert_eq!(category_for_wind(64.0), 2);
        assert_eq!(category_for_wind(95.0), 3);
        assert_eq!(category_for_wind(100.0), 4);
        assert_eq!(category_for_wind(134.9), 5);
        assert_eq!(category_for_wind(160.0), 6);
        assert_eq!(category_for_wind(f64::NAN), 0);
    }

    #[test]
    fn nearest_prefers_lower_on_tie() {
        let valid = [true, false, false, false, true, false, false];
        assert_eq!(nearest_valid(0, &valid), Some(0));
        assert_eq!(nearest_valid(1, &valid), Some(0));
        assert_eq!(nearest_valid(2, &valid), Some(0));
        assert_eq!(nearest_valid(3, &valid), Some(4));
        assert_eq!(nearest_valid(6, &valid), Some(4));
    }

    #[test]
    fn nearest_none_when_nothing_valid() {
        assert_eq!(nearest_valid(3, &[false; N_CATEGORIES]), None);
    }
}
