//! Signed difference choropleth.
//!
//! Each grid sample `(row, col)` except the last row and column becomes a
//! rectangle spanning one grid step north and east of it. Fill color comes
//! from a [`DivergingScale`] saturating at the grid's maximum absolute value;
//! fill opacity is the value's share of that maximum.

use std::{fmt::Write as _, path::Path};

use hotspot_analysis_models::DifferenceGrid;
use serde::{Deserialize, Serialize};

use crate::{RenderError, color::DivergingScale, html::LeafletPage, write_artifact};

/// One drawn rectangle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoroplethCell {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
    pub value: f64,
    pub fill_color: String,
    pub fill_opacity: f64,
    pub popup: String,
}

/// Options for [`render_choropleth`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoroplethOptions {
    pub zoom: u8,
    pub title: String,
}

impl Default for ChoroplethOptions {
    fn default() -> Self {
        Self {
            zoom: 12,
            title: "Density change".to_string(),
        }
    }
}

/// Computes the rectangles for `grid`.
///
/// # Errors
///
/// * If either axis has fewer than two samples
/// * If the value count does not match the axes
pub fn choropleth_cells(grid: &DifferenceGrid) -> Result<Vec<ChoroplethCell>, RenderError> {
    let (rows, cols) = grid.shape();
    if rows < 2 || cols < 2 {
        return Err(RenderError::invalid(format!(
            "difference grid {rows}x{cols} is too small to draw"
        )));
    }
    if grid.values.len() != rows * cols {
        return Err(RenderError::invalid(format!(
            "difference grid has {} values for a {rows}x{cols} shape",
            grid.values.len()
        )));
    }

    let lat_step = grid.axes.lat_step();
    let lon_step = grid.axes.lon_step();
    let scale = DivergingScale::new(grid.max_abs);

    let mut cells = Vec::with_capacity((rows - 1) * (cols - 1));
    for (row, &south) in grid.axes.lat.iter().enumerate().take(rows - 1) {
        for (col, &west) in grid.axes.lon.iter().enumerate().take(cols - 1) {
            let value = grid.values[row * cols + col];
            cells.push(ChoroplethCell {
                south,
                west,
                north: south + lat_step,
                east: west + lon_step,
                value,
                fill_color: scale.color(value).to_hex(),
                fill_opacity: grid.magnitude(value),
                popup: format!("Scaled Change: {}", scientific(value)),
            });
        }
    }

    Ok(cells)
}

/// Formats like C's `%.2e`: two fractional digits and a signed, two-digit
/// exponent.
fn scientific(value: f64) -> String {
    let formatted = format!("{value:.2e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = exponent
                .strip_prefix('-')
                .map_or(("+", exponent), |rest| ("-", rest));
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => formatted,
    }
}

/// Builds the choropleth page for `grid`, centered at `center` (`(lat, lon)`).
///
/// # Errors
///
/// * If the grid cannot be drawn (see [`choropleth_cells`])
/// * If the cell list fails to serialize
pub fn choropleth_html(
    grid: &DifferenceGrid,
    center: (f64, f64),
    options: &ChoroplethOptions,
) -> Result<String, RenderError> {
    let cells = choropleth_cells(grid)?;
    let visible = cells.iter().filter(|c| c.fill_opacity > 0.0).count();
    log::debug!("Drawing {} cells ({visible} non-zero)", cells.len());

    let mut script = String::new();
    let _ = writeln!(script, "const cells = {};", serde_json::to_string(&cells)?);
    script.push_str(
        "for (const c of cells) {\n  \
         L.rectangle([[c.south, c.west], [c.north, c.east]], {\n    \
         stroke: false, fill: true, fillColor: c.fillColor, fillOpacity: c.fillOpacity\n  \
         }).bindPopup(c.popup).addTo(map);\n}\n",
    );

    Ok(LeafletPage {
        title: &options.title,
        center,
        zoom: options.zoom,
        plugins: &[],
        script,
    }
    .render())
}

/// Writes the choropleth page to `path`.
///
/// # Errors
///
/// * If the page cannot be built (see [`choropleth_html`])
/// * If the file cannot be written
pub fn render_choropleth(
    grid: &DifferenceGrid,
    center: (f64, f64),
    options: &ChoroplethOptions,
    path: &Path,
) -> Result<(), RenderError> {
    let html = choropleth_html(grid, center, options)?;
    write_artifact(path, &html)
}
