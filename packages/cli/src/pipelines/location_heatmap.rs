//! `hotspot heatmap`: heat overlay of a table whose coordinates are stored
//! as a single `"(lat, lon)"` text column.

use std::path::Path;

use hotspot_analysis::clean::{CleanOptions, clean, require_events};
use hotspot_database::{LocalTable, LocalTableSource};
use hotspot_render::heatmap::render_heatmap;
use hotspot_source::parsing::FieldMapping;
use hotspot_source::{RecordQuery, RecordSource};

use crate::config::LocationHeatmapConfig;

pub async fn run(
    config: &LocationHeatmapConfig,
    csv: &Path,
    db: Option<&Path>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = LocalTable::load_csv(db, csv, &config.table)?;
    let source = LocalTableSource::new("locations", table);

    let query = RecordQuery::new(config.table.as_str())
        .select([&config.location_column])
        .where_not_null(config.location_column.as_str());
    let mapping = FieldMapping::default().with_location(&config.location_column);

    let events = source
        .fetch(&query)
        .await?
        .into_event_set(&mapping, &config.table);
    let events = clean(&events, &CleanOptions::default());
    require_events(&events)?;

    let points: Vec<(f64, f64)> = events.coordinates().collect();
    render_heatmap(&points, &config.heatmap, output)?;
    println!("Heatmap saved as {}", output.display());

    Ok(())
}
