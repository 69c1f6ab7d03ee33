//! Signed difference of two density surfaces.

use hotspot_analysis_models::{DensitySurface, DifferenceGrid};

use crate::AnalysisError;

/// Computes `later - earlier` cell by cell.
///
/// Both surfaces should already be scaled by their period totals and must
/// have been sampled on the same grid.
///
/// # Errors
///
/// Returns [`AnalysisError::ShapeMismatch`] if the grids differ in shape.
pub fn compare(
    earlier: &DensitySurface,
    later: &DensitySurface,
) -> Result<DifferenceGrid, AnalysisError> {
    if earlier.shape() != later.shape() {
        return Err(AnalysisError::ShapeMismatch {
            left: earlier.shape(),
            right: later.shape(),
        });
    }
    if earlier.axes != later.axes {
        log::warn!("Comparing surfaces sampled on different coordinates");
    }

    let values = earlier
        .values
        .iter()
        .zip(&later.values)
        .map(|(a, b)| b - a)
        .collect();
    let grid = DifferenceGrid::new(later.axes.clone(), values);
    log::info!("Density difference: max |change| = {:.3e}", grid.max_abs);
    Ok(grid)
}
