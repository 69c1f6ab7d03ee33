//! Two-dimensional Gaussian kernel density estimation.
//!
//! The kernel covariance is the sample covariance of the data (unbiased,
//! `n - 1`) scaled by the square of a bandwidth factor. The factor comes
//! from a [`BandwidthRule`]; [`Bandwidth::Scott`] is the default.

use std::f64::consts::PI;

use hotspot_analysis_models::{DensitySurface, GridAxes};
use hotspot_event_models::EventSet;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::AnalysisError;

/// Chooses the kernel bandwidth factor for `n` points in `dims` dimensions.
pub trait BandwidthRule: Send + Sync {
    /// Multiplier applied to the data's standard deviations.
    fn factor(&self, n: usize, dims: usize) -> f64;
}

/// Built-in bandwidth rules.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Bandwidth {
    /// `n^(-1 / (d + 4))`
    #[default]
    Scott,
    /// `(n (d + 2) / 4)^(-1 / (d + 4))`
    Silverman,
}

#[allow(clippy::cast_precision_loss)]
impl BandwidthRule for Bandwidth {
    fn factor(&self, n: usize, dims: usize) -> f64 {
        let n = n as f64;
        let d = dims as f64;
        match self {
            Self::Scott => n.powf(-1.0 / (d + 4.0)),
            Self::Silverman => (n * (d + 2.0) / 4.0).powf(-1.0 / (d + 4.0)),
        }
    }
}

/// A fixed factor regardless of sample size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedBandwidth(pub f64);

impl BandwidthRule for FixedBandwidth {
    fn factor(&self, _n: usize, _dims: usize) -> f64 {
        self.0
    }
}

/// Parameters of the density pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdeConfig {
    /// Samples per axis of the evaluation grid.
    pub grid_points: usize,
    /// Bandwidth rule.
    pub bandwidth: Bandwidth,
}

impl Default for KdeConfig {
    fn default() -> Self {
        Self {
            grid_points: 75,
            bandwidth: Bandwidth::Scott,
        }
    }
}

/// A fitted estimate over `(x, y)` points, with `x` = longitude and
/// `y` = latitude in the pipelines.
#[derive(Debug, Clone)]
pub struct GaussianKde {
    points: Vec<(f64, f64)>,
    /// Inverse kernel covariance `[[a, b], [b, d]]`.
    inv_cov: (f64, f64, f64),
    /// `1 / (n * 2π * sqrt(det Σ))`
    norm: f64,
    factor: f64,
}

impl GaussianKde {
    /// Fits an estimate to `points`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Numerical`] for fewer than two distinct
    /// points, non-finite input, or a singular covariance (all points on a
    /// line).
    #[allow(
        clippy::cast_precision_loss,
        clippy::many_single_char_names,
        clippy::suboptimal_flops
    )]
    pub fn fit(points: &[(f64, f64)], rule: &dyn BandwidthRule) -> Result<Self, AnalysisError> {
        let n = points.len();
        if n < 2 {
            return Err(AnalysisError::numerical(format!(
                "KDE needs at least 2 points, got {n}"
            )));
        }
        if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(AnalysisError::numerical("KDE input contains non-finite values"));
        }
        let first = points[0];
        if points.iter().all(|&p| p == first) {
            return Err(AnalysisError::numerical(
                "KDE needs at least 2 distinct points",
            ));
        }

        let nf = n as f64;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
        let (mx, my) = (sx / nf, sy / nf);

        let (mut cxx, mut cyy, mut cxy) = (0.0, 0.0, 0.0);
        for (x, y) in points {
            let dx = x - mx;
            let dy = y - my;
            cxx += dx * dx;
            cyy += dy * dy;
            cxy += dx * dy;
        }
        let ddof = nf - 1.0;
        let factor = rule.factor(n, 2);
        let f2 = factor * factor;
        let (a, d, b) = (cxx / ddof * f2, cyy / ddof * f2, cxy / ddof * f2);

        let det = a * d - b * b;
        if !det.is_finite() || det <= f64::EPSILON * a * d || !factor.is_finite() || factor <= 0.0
        {
            return Err(AnalysisError::numerical(format!(
                "singular kernel covariance (det = {det:e}); points may be collinear"
            )));
        }

        log::debug!("KDE fitted on {n} points, bandwidth factor {factor:.5}");

        Ok(Self {
            points: points.to_vec(),
            inv_cov: (d / det, -b / det, a / det),
            norm: 1.0 / (nf * 2.0 * PI * det.sqrt()),
            factor,
        })
    }

    /// The bandwidth factor the rule produced.
    #[must_use]
    pub const fn factor(&self) -> f64 {
        self.factor
    }

    /// Estimated density at `(x, y)`.
    #[must_use]
    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        let (ia, ib, id) = self.inv_cov;
        let sum: f64 = self
            .points
            .iter()
            .map(|(px, py)| {
                let dx = x - px;
                let dy = y - py;
                let q = ia * dx * dx + 2.0 * ib * dx * dy + id * dy * dy;
                (-0.5 * q).exp()
            })
            .sum();
        sum * self.norm
    }

    /// Samples the estimate at every `(lon, lat)` of `axes`, row by row.
    #[must_use]
    pub fn evaluate_grid(&self, axes: &GridAxes) -> DensitySurface {
        let values = axes
            .lat
            .iter()
            .flat_map(|&lat| axes.lon.iter().map(move |&lon| (lon, lat)))
            .map(|(lon, lat)| self.evaluate(lon, lat))
            .collect();
        DensitySurface {
            axes: axes.clone(),
            values,
            scale: 1.0,
        }
    }
}

/// A `grid_points x grid_points` grid spanning the extent of `combined`.
///
/// Every surface that will later be compared must be sampled on the same
/// axes, so build them from the union of all periods.
///
/// # Errors
///
/// Returns [`AnalysisError::DataQuality`] for an empty set and
/// [`AnalysisError::Numerical`] for fewer than two points per axis.
pub fn evaluation_axes(combined: &EventSet, grid_points: usize) -> Result<GridAxes, AnalysisError> {
    if grid_points < 2 {
        return Err(AnalysisError::numerical(format!(
            "evaluation grid needs at least 2 points per axis, got {grid_points}"
        )));
    }
    let extent = combined.extent().ok_or_else(|| {
        AnalysisError::data_quality(format!("no coordinates in {}", combined.label))
    })?;
    log::info!(
        "Evaluation grid {grid_points}x{grid_points}: lat {:.5}..{:.5}, lon {:.5}..{:.5}",
        extent.min_lat,
        extent.max_lat,
        extent.min_lon,
        extent.max_lon
    );
    Ok(GridAxes::linspace(
        (extent.min_lon, extent.max_lon),
        (extent.min_lat, extent.max_lat),
        grid_points,
    ))
}

/// Fits a KDE to the `(lon, lat)` pairs of `events` and samples it on
/// `axes`. The result is a probability density; scale it with
/// [`DensitySurface::scaled`] to get expected counts.
///
/// # Errors
///
/// Returns [`AnalysisError::Numerical`] if the estimate cannot be fitted.
pub fn density_surface(
    events: &EventSet,
    axes: &GridAxes,
    rule: &dyn BandwidthRule,
) -> Result<DensitySurface, AnalysisError> {
    let points: Vec<(f64, f64)> = events.coordinates().map(|(lat, lon)| (lon, lat)).collect();
    let kde = GaussianKde::fit(&points, rule)?;
    log::info!(
        "KDE for {}: {} points, bandwidth factor {:.4}",
        events.label,
        points.len(),
        kde.factor()
    );
    Ok(kde.evaluate_grid(axes))
}

#[cfg(test)]
mod tests {
    use hotspot_event_models::Event;

    use super::*;

    fn triangle() -> Vec<(f64, f64)> {
        vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]
    }

    #[test]
    fn scott_and_silverman_factors() {
        assert!((Bandwidth::Scott.factor(3, 2) - 3f64.powf(-1.0 / 6.0)).abs() < 1e-12);
        assert!((Bandwidth::Silverman.factor(100, 2) - 100f64.powf(-1.0 / 6.0)).abs() < 1e-12);
        assert!((FixedBandwidth(0.3).factor(1000, 2) - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn bandwidth_parses_from_name() {
        assert_eq!("silverman".parse::<Bandwidth>().unwrap(), Bandwidth::Silverman);
        assert_eq!(Bandwidth::default().to_string(), "scott");
    }

    #[test]
    fn density_integrates_to_one() {
        let kde = GaussianKde::fit(&triangle(), &Bandwidth::Scott).unwrap();
        let axes = GridAxes::linspace((-5.0, 6.0), (-5.0, 6.0), 221);
        let surface = kde.evaluate_grid(&axes);
        let cell = axes.lon_step() * axes.lat_step();
        let total: f64 = surface.values.iter().sum::<f64>() * cell;
        assert!((total - 1.0).abs() < 1e-3, "integral was {total}");
    }

    #[test]
    fn density_is_symmetric_for_symmetric_data() {
        let kde = GaussianKde::fit(&triangle(), &Bandwidth::Scott).unwrap();
        let a = kde.evaluate(1.0, 0.0);
        let b = kde.evaluate(0.0, 1.0);
        assert!((a - b).abs() < 1e-12);
        assert!(kde.evaluate(0.3, 0.3) > kde.evaluate(3.0, 3.0));
    }

    #[test]
    fn wider_bandwidth_flattens_the_peak() {
        let narrow = GaussianKde::fit(&triangle(), &FixedBandwidth(0.5)).unwrap();
        let wide = GaussianKde::fit(&triangle(), &FixedBandwidth(2.0)).unwrap();
        assert!(narrow.evaluate(0.0, 0.0) > wide.evaluate(0.0, 0.0));
    }

    #[test]
    fn rejects_degenerate_input() {
        let rule = Bandwidth::Scott;
        assert!(matches!(
            GaussianKde::fit(&[(1.0, 1.0)], &rule),
            Err(AnalysisError::Numerical { .. })
        ));
        assert!(matches!(
            GaussianKde::fit(&[(1.0, 1.0); 10], &rule),
            Err(AnalysisError::Numerical { .. })
        ));
        assert!(matches!(
            GaussianKde::fit(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)], &rule),
            Err(AnalysisError::Numerical { .. })
        ));
    }

    #[test]
    fn grid_is_row_major_by_latitude() {
        let kde = GaussianKde::fit(&triangle(), &Bandwidth::Scott).unwrap();
        let axes = GridAxes {
            lon: vec![0.0, 10.0],
            lat: vec![0.0, 1.0, 2.0],
        };
        let surface = kde.evaluate_grid(&axes);
        assert_eq!(surface.shape(), (3, 2));
        let expected = kde.evaluate(10.0, 2.0);
        assert!((surface.get(2, 1).unwrap() - expected).abs() < 1e-15);
    }

    #[test]
    fn axes_span_the_combined_extent() {
        let a = EventSet::new("a", vec![Event::at(42.30, -71.10), Event::at(42.31, -71.05)]);
        let b = EventSet::new("b", vec![Event::at(42.35, -71.00)]);
        let axes = evaluation_axes(&a.merged(&b), 75).unwrap();
        assert_eq!(axes.shape(), (75, 75));
        assert!((axes.lat[0] - 42.30).abs() < 1e-12);
        assert!((axes.lat[74] - 42.35).abs() < 1e-12);
        assert!((axes.lon[0] - -71.10).abs() < 1e-12);
        assert!((axes.lon[74] - -71.00).abs() < 1e-12);

        assert!(evaluation_axes(&EventSet::default(), 75).is_err());
        assert!(evaluation_axes(&a, 1).is_err());
    }

    #[test]
    fn surface_uses_longitude_as_x() {
        let events = EventSet::new(
            "t",
            vec![
                Event::at(42.30, -71.10),
                Event::at(42.32, -71.06),
                Event::at(42.31, -71.02),
                Event::at(42.35, -71.04),
            ],
        );
        let axes = evaluation_axes(&events, 10).unwrap();
        let surface = density_surface(&events, &axes, &Bandwidth::Scott).unwrap();
        assert_eq!(surface.values.len(), 100);
        assert!(surface.values.iter().all(|v| v.is_finite() && *v >= 0.0));
    }
}
