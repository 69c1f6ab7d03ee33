//! Location entropy of `(category, hour)` groups.
//!
//! Low entropy means a category concentrates in a few places at that hour;
//! high entropy means it is spread across the city.

use std::collections::BTreeMap;

use hotspot_analysis_models::EntropyRecord;
use hotspot_event_models::EventSet;
use serde::{Deserialize, Serialize};

use crate::AnalysisError;
use crate::grid::SpatialGrid;

/// Parameters of the entropy ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntropyConfig {
    /// Latitude bins.
    pub rows: usize,
    /// Longitude bins.
    pub cols: usize,
    /// Groups with fewer events are not ranked.
    pub min_group_samples: usize,
    /// Categories with fewer events overall are dropped before grouping.
    pub min_category_support: usize,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            rows: 20,
            cols: 20,
            min_group_samples: 50,
            min_category_support: 100,
        }
    }
}

/// Shannon entropy, in bits, of the distribution proportional to `counts`.
/// Zero counts are ignored.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn shannon_entropy(counts: impl IntoIterator<Item = u64>) -> f64 {
    let counts: Vec<u64> = counts.into_iter().filter(|&c| c > 0).collect();
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    let h = counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum::<f64>();
    // Single-cell groups sum to -0.0, which `total_cmp` orders below 0.0.
    if h > 0.0 { h } else { 0.0 }
}

#[derive(Default)]
struct Group {
    cells: BTreeMap<usize, u64>,
    total: usize,
}

/// Ranks `(category, hour)` groups by location entropy, highest first.
///
/// Events need a category, an hour and coordinates to take part.
/// Categories below [`EntropyConfig::min_category_support`] are dropped
/// first; the grid then spans the remaining events, and groups below
/// [`EntropyConfig::min_group_samples`] are left out of the result. Groups
/// with equal entropy are ordered by category, then hour.
///
/// # Errors
///
/// Returns [`AnalysisError::DataQuality`] if no event is usable and
/// [`AnalysisError::Numerical`] for a zero grid dimension.
pub fn entropy_ranking(
    events: &EventSet,
    config: &EntropyConfig,
) -> Result<Vec<EntropyRecord>, AnalysisError> {
    let usable: Vec<(&str, u8, f64, f64)> = events
        .iter()
        .filter_map(|e| {
            let (lat, lon) = e.coordinates()?;
            Some((e.category.as_deref()?, e.hour_of_day()?, lat, lon))
        })
        .collect();

    if usable.is_empty() {
        return Err(AnalysisError::data_quality(format!(
            "no events in {} have a category, hour and coordinates",
            events.label
        )));
    }

    let mut support: BTreeMap<&str, usize> = BTreeMap::new();
    for (category, ..) in &usable {
        *support.entry(*category).or_default() += 1;
    }

    let supported: Vec<(&str, u8, f64, f64)> = usable
        .into_iter()
        .filter(|(category, ..)| support[category] >= config.min_category_support)
        .collect();

    let dropped_categories = support
        .values()
        .filter(|&&n| n < config.min_category_support)
        .count();
    log::info!(
        "{} of {} categories have at least {} events",
        support.len() - dropped_categories,
        support.len(),
        config.min_category_support
    );

    if supported.is_empty() {
        log::warn!("No category reaches the support threshold; nothing to rank");
        return Ok(Vec::new());
    }

    let grid = SpatialGrid::covering(
        supported.iter().map(|&(_, _, lat, lon)| (lat, lon)),
        config.rows,
        config.cols,
    )?;
    log::debug!("Entropy grid {}x{} over {:?}", grid.rows(), grid.cols(), grid.extent());

    let mut groups: BTreeMap<(&str, u8), Group> = BTreeMap::new();
    for &(category, hour, lat, lon) in &supported {
        let Some(cell) = grid.cell_index(lat, lon) else {
            continue;
        };
        let group = groups.entry((category, hour)).or_default();
        *group.cells.entry(cell).or_default() += 1;
        group.total += 1;
    }

    let mut records: Vec<EntropyRecord> = groups
        .iter()
        .filter(|(_, g)| g.total >= config.min_group_samples)
        .map(|(&(category, hour), g)| EntropyRecord {
            category: category.to_string(),
            hour,
            entropy: shannon_entropy(g.cells.values().copied()),
            sample_count: g.total,
            occupied_cells: g.cells.len(),
        })
        .collect();

    log::info!(
        "Ranked {} of {} groups with at least {} samples",
        records.len(),
        groups.len(),
        config.min_group_samples
    );

    // `sort_by` is stable: ties stay in (category, hour) order.
    records.sort_by(|a, b| b.entropy.total_cmp(&a.entropy));
    Ok(records)
}
