//! `hotspot entropy`: rank offenses by how concentrated they are at each
//! hour, then map one offense at the hours of interest.

use std::path::Path;

use hotspot_analysis::clean::{CleanOptions, clean, require_events};
use hotspot_analysis::entropy::entropy_ranking;
use hotspot_analysis_models::EntropyRecord;
use hotspot_database::{LocalTable, LocalTableSource};
use hotspot_event_models::{Event, EventSet};
use hotspot_render::heatmap::render_heatmap;
use hotspot_source::parsing::FieldMapping;
use hotspot_source::{RecordQuery, RecordSource};

use crate::config::CrimeConfig;

/// One line of the printed ranking.
pub fn format_ranking_line(rank: usize, record: &EntropyRecord) -> String {
    format!(
        "{rank}. {} @ Hour {:02}: Entropy = {:.4} - Count = {}",
        record.category, record.hour, record.entropy, record.sample_count
    )
}

/// `(lat, lon)` of events in `category` at one of `hours`.
pub fn offense_points(events: &EventSet, category: &str, hours: &[u8]) -> Vec<(f64, f64)> {
    events
        .iter()
        .filter(|e| e.category.as_deref() == Some(category))
        .filter(|e| e.hour_of_day().is_some_and(|h| hours.contains(&h)))
        .filter_map(Event::coordinates)
        .collect()
}

pub async fn run(
    config: &CrimeConfig,
    csv: &Path,
    db: Option<&Path>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = LocalTable::load_csv(db, csv, &config.table)?;
    println!(
        "Database '{}' created with {} rows.",
        table.table(),
        table.row_count()?
    );
    let source = LocalTableSource::new("crime", table);

    let query = RecordQuery::new(config.table.as_str())
        .select([
            &config.category_column,
            &config.hour_column,
            &config.latitude_column,
            &config.longitude_column,
        ])
        .where_not_null(config.hour_column.as_str())
        .where_not_null(config.latitude_column.as_str())
        .where_not_null(config.longitude_column.as_str())
        .where_not_null(config.category_column.as_str());

    let mapping = FieldMapping::lat_lon(&config.latitude_column, &config.longitude_column)
        .with_category(&config.category_column)
        .with_hour(&config.hour_column);

    let events = source
        .fetch(&query)
        .await?
        .into_event_set(&mapping, "crime reports");
    let events = clean(&events, &CleanOptions::default());
    require_events(&events)?;

    let ranking = entropy_ranking(&events, &config.entropy)?;
    let shown = config.top.unwrap_or(ranking.len()).min(ranking.len());

    println!();
    println!(
        "--- Location Entropies by Offense and Hour (>= {} samples) ---",
        config.entropy.min_group_samples
    );
    for (i, record) in ranking.iter().take(shown).enumerate() {
        println!("{}", format_ranking_line(i + 1, record));
    }
    if shown < ranking.len() {
        println!("... {} more", ranking.len() - shown);
    }

    let points = offense_points(&events, &config.heatmap_offense, &config.heatmap_hours);
    log::info!(
        "{} events of '{}' at hours {:?}",
        points.len(),
        config.heatmap_offense,
        config.heatmap_hours
    );
    render_heatmap(&points, &config.heatmap, output)?;
    println!();
    println!("Heatmap saved as {}", output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_line_format() {
        let record = EntropyRecord {
            category: "LARCENY SHOPLIFTING".to_string(),
            hour: 7,
            entropy: 3.141_59,
            sample_count: 120,
            occupied_cells: 14,
        };
        assert_eq!(
            format_ranking_line(1, &record),
            "1. LARCENY SHOPLIFTING @ Hour 07: Entropy = 3.1416 - Count = 120"
        );
    }

    #[test]
    fn selects_offense_at_hours() {
        let events = EventSet::new(
            "test",
            vec![
                Event::at(42.30, -71.05).with_category("DRUGS").with_hour(8),
                Event::at(42.31, -71.06).with_category("DRUGS").with_hour(12),
                Event::at(42.32, -71.07).with_category("FRAUD").with_hour(8),
                Event::at(42.33, -71.08).with_category("DRUGS").with_hour(9),
            ],
        );
        let points = offense_points(&events, "DRUGS", &[7, 8, 9]);
        assert_eq!(points, vec![(42.30, -71.05), (42.33, -71.08)]);
    }
}
