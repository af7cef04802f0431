use serde::{Deserialize, Serialize};

use crate::coords::BoundingBox;
use crate::error::{Result, SurgeError};

/// A regular lon/lat raster of elevation in metres, row-major.
///
/// Row 0 is `min_lat`, column 0 is `min_lon`; the outermost nodes sit exactly
/// on the bounds. Coordinate math uses f64; elevation values use f32.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeightField {
    /// Row-major elevation values in metres. Negative below sea level.
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl HeightField {
    /// Create a new HeightField filled with the given value.
    pub fn new(width: usize, height: usize, min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64, fill: f32) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f32) {
        self.data[row * self.width + col] = val;
    }

    /// Longitude of the nodes in column `col`.
    pub fn node_lon(&self, col: usize) -> f64 {
        node_coord(self.min_lon, self.max_lon, self.width, col)
    }

    /// Latitude of the nodes in row `row`.
    pub fn node_lat(&self, row: usize) -> f64 {
        node_coord(self.min_lat, self.max_lat, self.height, row)
    }

    /// Sample the field at (lon, lat) using bilinear interpolation.
    /// Returns None if (lon, lat) is outside the field bounds.
    pub fn sample(&self, lon: f64, lat: f64) -> Option<f32> {
        if self.is_empty() || !self.bounds().contains(lon, lat) {
            return None;
        }

        let fx = fractional_index(self.min_lon, self.max_lon, self.width, lon);
        let fy = fractional_index(self.min_lat, self.max_lat, self.height, lat);

        let x0 = (fx.floor() as usize).min(self.width - 1);
        let y0 = (fy.floor() as usize).min(self.height - 1);
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let tx = (fx - x0 as f64) as f32;
        let ty = (fy - y0 as f64) as f32;

        let v00 = self.get(y0, x0);
        let v10 = self.get(y0, x1);
        let v01 = self.get(y1, x0);
        let v11 = self.get(y1, x1);

        let v = v00 * (1.0 - tx) * (1.0 - ty)
            + v10 * tx * (1.0 - ty)
            + v01 * (1.0 - tx) * ty
            + v11 * tx * ty;

        Some(v)
    }

    /// Sub-raster made of the nodes that fall inside `bbox`.
    /// Returns None when no node does.
    pub fn crop(&self, bbox: &BoundingBox) -> Option<HeightField> {
        let cols: Vec<usize> = (0..self.width)
            .filter(|&c| (bbox.min_lon..=bbox.max_lon).contains(&self.node_lon(c)))
            .collect();
        let rows: Vec<usize> = (0..self.height)
            .filter(|&r| (bbox.min_lat..=bbox.max_lat).contains(&self.node_lat(r)))
            .collect();
        let (&c0, &c1) = (cols.first()?, cols.last()?);
        let (&r0, &r1) = (rows.first()?, rows.last()?);

        let mut out = HeightField::new(
            c1 - c0 + 1,
            r1 - r0 + 1,
            self.node_lon(c0),
            self.node_lon(c1),
            self.node_lat(r0),
            self.node_lat(r1),
            0.0,
        );
        for r in r0..=r1 {
            let src = &self.data[r * self.width + c0..=r * self.width + c1];
            let dst_start = (r - r0) * out.width;
            out.data[dst_start..dst_start + out.width].copy_from_slice(src);
        }
        Some(out)
    }

    /// Checks a raster read from storage: one value per node and finite,
    /// ordered bounds.
    pub fn validate(&self) -> Result<()> {
        let nodes = self.width * self.height;
        if self.data.len() != nodes {
            return Err(SurgeError::ShapeMismatch {
                what: "heightfield data",
                expected: nodes,
                actual: self.data.len(),
            });
        }
        let finite = [self.min_lon, self.max_lon, self.min_lat, self.max_lat]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.max_lon < self.min_lon || self.max_lat < self.min_lat {
            return Err(SurgeError::DegenerateBounds {
                min_lon: self.min_lon,
                max_lon: self.max_lon,
                min_lat: self.min_lat,
                max_lat: self.max_lat,
            });
        }
        Ok(())
    }
}

fn node_coord(min: f64, max: f64, n: usize, i: usize) -> f64 {
    if n <= 1 {
        min
    } else {
        min + (max - min) * i as f64 / (n - 1) as f64
    }
}

fn fractional_index(min: f64, max: f64, n: usize, v: f64) -> f64 {
    if n <= 1 || max <= min {
        0.0
    } else {
        (v - min) / (max - min) * (n - 1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corners() -> HeightField {
        let mut hf = HeightField::new(4, 4, -180.0, 180.0, -90.0, 90.0, 0.0);
        hf.set(0, 0, 10.0);
        hf.set(0, 3, 20.0);
        hf.set(3, 0, 30.0);
        hf.set(3, 3, 40.0);
        hf
    }

    #[test]
    fn sample_corners_return_exact_values() {
        let hf = corners();
        assert!((hf.sample(hf.min_lon, hf.min_lat).unwrap() - 10.0).abs() < 1e-5);
        assert!((hf.sample(hf.max_lon, hf.min_lat).unwrap() - 20.0).abs() < 1e-5);
        assert!((hf.sample(hf.min_lon, hf.max_lat).unwrap() - 30.0).abs() < 1e-5);
        assert!((hf.sample(hf.max_lon, hf.max_lat).unwrap() - 40.0).abs() < 1e-5);
    }

    #[test]
    fn sample_midpoint_is_bilinear() {
        let mut hf = HeightField::new(2, 2, 0.0, 1.0, 0.0, 1.0, 0.0);
        hf.data = vec![0.0, 2.0, 4.0, 6.0];
        assert!((hf.sample(0.5, 0.5).unwrap() - 3.0).abs() < 1e-6);
        assert!((hf.sample(0.25, 0.0).unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn sample_out_of_bounds_returns_none() {
        let hf = corners();
        assert!(hf.sample(-200.0, 0.0).is_none());
        assert!(hf.sample(0.0, -100.0).is_none());
    }

    #[test]
    fn crop_keeps_inner_nodes_and_their_coordinates() {
        // 11 × 11 nodes at 0.1° spacing over [0, 1]².
        let mut hf = HeightField::new(11, 11, 0.0, 1.0, 0.0, 1.0, 0.0);
        for r in 0..11 {
            for c in 0..11 {
                hf.set(r, c, (r * 100 + c) as f32);
            }
        }
        let sub = hf.crop(&BoundingBox::new(0.25, 0.45, 0.55, 0.75)).unwrap();
        assert_eq!((sub.width, sub.height), (3, 3));
        assert!((sub.min_lon - 0.3).abs() < 1e-9);
        assert!((sub.max_lat - 0.7).abs() < 1e-9);
        assert_eq!(sub.get(0, 0), 503.0);
        assert_eq!(sub.get(2, 2), 705.0);
    }

    #[test]
    fn validate_rejects_short_data_and_inverted_bounds() {
        let mut hf = HeightField::new(5, 5, 0.0, 1.0, 0.0, 1.0, 1.0);
        hf.validate().unwrap();
        hf.data.truncate(3);
        assert!(matches!(
            hf.validate(),
            Err(SurgeError::ShapeMismatch { expected: 25, actual: 3, .. })
        ));
        let flipped = HeightField::new(2, 2, 1.0, 0.0, 0.0, 1.0, 1.0);
        assert!(matches!(flipped.validate(), Err(SurgeError::DegenerateBounds { .. })));
    }

    #[test]
    fn crop_outside_returns_none() {
        let hf = corners();
        assert!(hf.crop(&BoundingBox::new(190.0, 0.0, 200.0, 1.0)).is_none());
    }
}
