#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types produced by the hotspot aggregators.
//!
//! Grids are stored row-major with rows running along latitude and columns
//! along longitude, so `values[row * cols + col]` is the sample at
//! `(lat[row], lon[col])`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Location entropy of one `(category, hour)` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntropyRecord {
    /// Category label (e.g. the offense description).
    pub category: String,
    /// Hour of day.
    pub hour: u8,
    /// Shannon entropy of the group's distribution over grid cells, in bits.
    pub entropy: f64,
    /// Number of events in the group.
    pub sample_count: usize,
    /// Number of distinct grid cells the group occupies.
    pub occupied_cells: usize,
}

/// Sample coordinates of a regular evaluation grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAxes {
    /// Longitudes, ascending. One per column.
    pub lon: Vec<f64>,
    /// Latitudes, ascending. One per row.
    pub lat: Vec<f64>,
}

impl GridAxes {
    /// `n` evenly spaced samples over each range, endpoints included.
    #[must_use]
    pub fn linspace(lon_range: (f64, f64), lat_range: (f64, f64), n: usize) -> Self {
        Self {
            lon: linspace(lon_range.0, lon_range.1, n),
            lat: linspace(lat_range.0, lat_range.1, n),
        }
    }

    /// `(rows, cols)`.
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.lat.len(), self.lon.len())
    }

    /// Spacing between consecutive latitude samples.
    #[must_use]
    pub fn lat_step(&self) -> f64 {
        step(&self.lat)
    }

    /// Spacing between consecutive longitude samples.
    #[must_use]
    pub fn lon_step(&self) -> f64 {
        step(&self.lon)
    }
}

#[allow(clippy::cast_precision_loss)]
fn step(axis: &[f64]) -> f64 {
    match axis {
        [first, .., last] => (last - first) / (axis.len() - 1) as f64,
        _ => 0.0,
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { (i as f64).mul_add(step, start) })
                .collect()
        }
    }
}

/// A continuous density sampled on [`GridAxes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensitySurface {
    /// Where each value was sampled.
    pub axes: GridAxes,
    /// Row-major samples.
    pub values: Vec<f64>,
    /// Factor the raw density was multiplied by (1.0 when unscaled).
    pub scale: f64,
}

impl DensitySurface {
    /// `(rows, cols)`.
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        self.axes.shape()
    }

    /// Value at `(row, col)`.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        let (rows, cols) = self.shape();
        (row < rows && col < cols).then(|| self.values[row * cols + col])
    }

    /// Multiplies every sample by `factor`, turning a probability density
    /// into an expected-count density.
    #[must_use]
    pub fn scaled(mut self, factor: f64) -> Self {
        for v in &mut self.values {
            *v *= factor;
        }
        self.scale *= factor;
        self
    }
}

/// Signed element-wise difference of two surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifferenceGrid {
    /// Where each value was sampled.
    pub axes: GridAxes,
    /// Row-major `later - earlier` values.
    pub values: Vec<f64>,
    /// Largest absolute value in the grid.
    pub max_abs: f64,
}

impl DifferenceGrid {
    /// Builds a grid and computes its maximum absolute value.
    #[must_use]
    pub fn new(axes: GridAxes, values: Vec<f64>) -> Self {
        let max_abs = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        Self {
            axes,
            values,
            max_abs,
        }
    }

    /// `(rows, cols)`.
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        self.axes.shape()
    }

    /// Value at `(row, col)`.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        let (rows, cols) = self.shape();
        (row < rows && col < cols).then(|| self.values[row * cols + col])
    }

    /// `|value| / max_abs`, or 0 when the grid is identically zero.
    #[must_use]
    pub fn magnitude(&self, value: f64) -> f64 {
        if self.max_abs > 0.0 {
            (value.abs() / self.max_abs).min(1.0)
        } else {
            0.0
        }
    }
}

/// Number of events on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_hits_both_ends() {
        let v = linspace(-71.2, -70.9, 75);
        assert_eq!(v.len(), 75);
        assert!((v[0] - -71.2).abs() < 1e-12);
        assert!((v[74] - -70.9).abs() < 1e-12);
        assert!(v.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn linspace_degenerate_sizes() {
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(3.0, 5.0, 1), vec![3.0]);
    }

    #[test]
    fn axes_step() {
        let axes = GridAxes::linspace((0.0, 10.0), (0.0, 1.0), 11);
        assert!((axes.lon_step() - 1.0).abs() < 1e-12);
        assert!((axes.lat_step() - 0.1).abs() < 1e-12);
        assert_eq!(axes.shape(), (11, 11));
    }

    #[test]
    fn difference_magnitude_guards_zero_grid() {
        let axes = GridAxes::linspace((0.0, 1.0), (0.0, 1.0), 2);
        let zero = DifferenceGrid::new(axes.clone(), vec![0.0; 4]);
        assert!(zero.max_abs.abs() < f64::EPSILON);
        assert!(zero.magnitude(0.0).abs() < f64::EPSILON);

        let grid = DifferenceGrid::new(axes, vec![-4.0, 2.0, 0.0, 1.0]);
        assert!((grid.max_abs - 4.0).abs() < f64::EPSILON);
        assert!((grid.magnitude(-4.0) - 1.0).abs() < f64::EPSILON);
        assert!((grid.magnitude(2.0) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn scaling_multiplies_values() {
        let surface = DensitySurface {
            axes: GridAxes::linspace((0.0, 1.0), (0.0, 1.0), 2),
            values: vec![1.0, 2.0, 3.0, 4.0],
            scale: 1.0,
        };
        let scaled = surface.scaled(10.0);
        assert_eq!(scaled.values, vec![10.0, 20.0, 30.0, 40.0]);
        assert!((scaled.scale - 10.0).abs() < f64::EPSILON);
        assert_eq!(scaled.get(1, 0), Some(30.0));
        assert_eq!(scaled.get(2, 0), None);
    }
}
