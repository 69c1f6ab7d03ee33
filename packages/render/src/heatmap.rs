//! Point heat overlay.

use std::path::Path;

use rand::{SeedableRng, rngs::StdRng, seq::index};
use serde::{Deserialize, Serialize};

use crate::{
    RenderError,
    html::{LEAFLET_HEAT_JS, LeafletPage},
    write_artifact,
};

/// Options for [`render_heatmap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapOptions {
    /// Point sets larger than this are randomly sampled down to it. `None`
    /// draws every point.
    pub sample_cap: Option<usize>,
    /// Heat layer point radius in pixels; the plugin default when `None`.
    pub radius: Option<u32>,
    /// Seed for the sampler. Unseeded runs differ from each other.
    pub seed: Option<u64>,
    /// Initial zoom level.
    pub zoom: u8,
    /// Page title.
    pub title: String,
}

impl Default for HeatmapOptions {
    fn default() -> Self {
        Self {
            sample_cap: Some(10_000),
            radius: None,
            seed: None,
            zoom: 12,
            title: "Heatmap".to_string(),
        }
    }
}

/// Picks at most `cap` points uniformly without replacement, keeping their
/// original order. Without a cap every point is kept.
#[must_use]
pub fn sample_points(
    points: &[(f64, f64)],
    cap: Option<usize>,
    seed: Option<u64>,
) -> Vec<(f64, f64)> {
    let Some(cap) = cap.filter(|&cap| cap < points.len()) else {
        return points.to_vec();
    };

    let mut picked = match seed {
        Some(seed) => index::sample(&mut StdRng::seed_from_u64(seed), points.len(), cap),
        None => index::sample(&mut rand::rng(), points.len(), cap),
    }
    .into_vec();
    picked.sort_unstable();

    log::debug!("Sampled {cap} of {} points", points.len());

    picked.into_iter().map(|i| points[i]).collect()
}

/// Mean `(lat, lon)` of `points`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_center(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (lat, lon) = points
        .iter()
        .fold((0.0, 0.0), |(a, b), (lat, lon)| (a + lat, b + lon));
    Some((lat / n, lon / n))
}

/// Builds the heat overlay page for `(lat, lon)` points, sampling first if
/// needed. The map is centered on the mean of the drawn points.
///
/// # Errors
///
/// * If `points` is empty
/// * If the point list fails to serialize
pub fn heatmap_html(points: &[(f64, f64)], options: &HeatmapOptions) -> Result<String, RenderError> {
    let drawn = sample_points(points, options.sample_cap, options.seed);
    let center =
        mean_center(&drawn).ok_or_else(|| RenderError::invalid("no points to draw"))?;

    let data: Vec<[f64; 2]> = drawn.iter().map(|&(lat, lon)| [lat, lon]).collect();
    let layer_options = options
        .radius
        .map_or_else(|| "{}".to_string(), |r| format!("{{ radius: {r} }}"));

    let script = format!(
        "const points = {};\nL.heatLayer(points, {layer_options}).addTo(map);\n",
        serde_json::to_string(&data)?
    );

    Ok(LeafletPage {
        title: &options.title,
        center,
        zoom: options.zoom,
        plugins: &[LEAFLET_HEAT_JS],
        script,
    }
    .render())
}

/// Writes the heat overlay page to `path`.
///
/// # Errors
///
/// * If the page cannot be built (see [`heatmap_html`])
/// * If the file cannot be written
pub fn render_heatmap(
    points: &[(f64, f64)],
    options: &HeatmapOptions,
    path: &Path,
) -> Result<(), RenderError> {
    let html = heatmap_html(points, options)?;
    write_artifact(path, &html)
}
