//! Daily count line chart.

use std::path::Path;

use chrono::Duration;
use hotspot_analysis_models::DailyCount;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};

use crate::RenderError;

/// Options for [`render_daily_series`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSeriesOptions {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// Legend label of the series.
    pub label: String,
    /// Y axis description.
    pub y_desc: String,
}

impl Default for TimeSeriesOptions {
    fn default() -> Self {
        Self {
            width: 1400,
            height: 600,
            title: "Daily Counts".to_string(),
            label: "Count".to_string(),
            y_desc: "Number of Reports".to_string(),
        }
    }
}

fn chart_error(e: impl std::fmt::Display) -> RenderError {
    RenderError::Chart {
        message: e.to_string(),
    }
}

/// Draws `series` as a PNG line chart at `path`.
///
/// # Errors
///
/// * If `series` is empty
/// * If the chart backend fails to draw or encode the image
pub fn render_daily_series(
    series: &[DailyCount],
    options: &TimeSeriesOptions,
    path: &Path,
) -> Result<(), RenderError> {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return Err(RenderError::invalid("no daily counts to plot"));
    };
    let y_max = series.iter().map(|d| d.count).max().unwrap_or(0);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_error)?;

    let x_range = (first.date - Duration::days(1))..(last.date + Duration::days(1));
    let y_range = 0u64..(y_max + y_max / 10 + 1);

    let mut chart = ChartBuilder::on(&root)
        .caption(&options.title, ("sans-serif", 28))
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(x_range, y_range)
        .map_err(chart_error)?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc(&options.y_desc)
        .x_label_formatter(&|d| d.format("%Y-%m-%d").to_string())
        .draw()
        .map_err(chart_error)?;

    let color = RGBColor(31, 119, 180);
    chart
        .draw_series(LineSeries::new(
            series.iter().map(|d| (d.date, d.count)),
            &color,
        ))
        .map_err(chart_error)?
        .label(&options.label)
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(chart_error)?;

    root.present().map_err(chart_error)?;
    log::info!("Wrote {} ({} days)", path.display(), series.len());

    Ok(())
}
