//! Equal-width spatial binning.
//!
//! Edges come from the extent of the events being binned, not from a fixed
//! geographic frame, so two runs over different data produce different
//! grids. Bins are closed on the right (`(a, b]`) with the first bin also
//! taking the minimum, so the maximum coordinate falls in the last bin.

use hotspot_event_models::BoundingBox;

use crate::AnalysisError;

/// An `rows x cols` partition of a latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialGrid {
    rows: usize,
    cols: usize,
    extent: BoundingBox,
}

impl SpatialGrid {
    /// Builds a grid spanning `extent`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Numerical`] if either dimension is zero.
    pub fn new(extent: BoundingBox, rows: usize, cols: usize) -> Result<Self, AnalysisError> {
        if rows == 0 || cols == 0 {
            return Err(AnalysisError::numerical(format!(
                "grid dimensions must be positive, got {rows}x{cols}"
            )));
        }
        Ok(Self { rows, cols, extent })
    }

    /// Builds a grid spanning the extent of `points` (`(lat, lon)`).
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::DataQuality`] for no points and
    /// [`AnalysisError::Numerical`] for a zero dimension.
    pub fn covering(
        points: impl IntoIterator<Item = (f64, f64)>,
        rows: usize,
        cols: usize,
    ) -> Result<Self, AnalysisError> {
        let extent = BoundingBox::covering(points)
            .ok_or_else(|| AnalysisError::data_quality("cannot build a grid over no points"))?;
        Self::new(extent, rows, cols)
    }

    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub const fn extent(&self) -> BoundingBox {
        self.extent
    }

    /// Total number of cells.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Row-major cell index (`lat_bin * cols + lon_bin`), or `None` if the
    /// point lies outside the grid.
    #[must_use]
    pub fn cell_index(&self, lat: f64, lon: f64) -> Option<usize> {
        let row = axis_bin(lat, self.extent.min_lat, self.extent.max_lat, self.rows)?;
        let col = axis_bin(lon, self.extent.min_lon, self.extent.max_lon, self.cols)?;
        Some(row * self.cols + col)
    }
}

/// Bin of `value` among `n` equal-width bins over `[min, max]`.
///
/// A zero-width range puts everything in bin 0.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn axis_bin(value: f64, min: f64, max: f64, n: usize) -> Option<usize> {
    if n == 0 || !value.is_finite() || value < min || value > max {
        return None;
    }
    let width = (max - min) / n as f64;
    if width <= 0.0 {
        return Some(0);
    }
    let pos = ((value - min) / width).ceil();
    Some((pos as usize).saturating_sub(1).min(n - 1))
}
