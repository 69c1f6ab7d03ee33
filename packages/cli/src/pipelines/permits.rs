//! `hotspot permit-change`: where did building permit activity grow or
//! shrink between two years?
//!
//! Each year's sample is smoothed with a Gaussian KDE, both estimates are
//! sampled on one grid spanning the two samples, scaled by the year's total
//! permit count, and subtracted. The count comes from a separate count
//! query and is usually larger than the capped sample.

use std::path::Path;

use hotspot_analysis::clean::{CleanOptions, clean, require_events};
use hotspot_analysis::compare::compare;
use hotspot_analysis::kde::{density_surface, evaluation_axes};
use hotspot_cli_utils::{MultiProgress, StageBar};
use hotspot_event_models::EventSet;
use hotspot_render::choropleth::render_choropleth;
use hotspot_source::parsing::FieldMapping;
use hotspot_source::{RecordQuery, RecordSource};

use crate::config::{PermitConfig, RemoteConfig};
use crate::pipelines::remote_source;

/// Permits issued in `year`.
pub fn year_query(config: &PermitConfig, year: i32) -> RecordQuery {
    RecordQuery::new(config.resource.as_str()).in_year(config.date_column.as_str(), year)
}

struct YearSample {
    year: i32,
    total: u64,
    events: EventSet,
}

async fn fetch_year(
    config: &PermitConfig,
    remote: &RemoteConfig,
    multi: &MultiProgress,
    year: i32,
) -> Result<YearSample, Box<dyn std::error::Error>> {
    let label = format!("permits {year}");
    let source = remote_source(remote, remote.paging.clone(), multi, &label);
    let query = year_query(config, year);

    println!("Fetching total count for {year}...");
    let total = source.count(&query).await?;
    println!("Found {total} total records for {year}.");

    let mapping = FieldMapping::lat_lon(&config.latitude_column, &config.longitude_column);
    let events = source.fetch(&query).await?.into_event_set(&mapping, &label);
    if events.truncated {
        log::warn!("{label}: sample is incomplete because a page failed to load");
    }

    Ok(YearSample {
        year,
        total,
        events,
    })
}

#[allow(clippy::cast_precision_loss)]
pub async fn run(
    config: &PermitConfig,
    remote: &RemoteConfig,
    output: &Path,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let stages = StageBar::new(multi, "permit-change", 5);
    stages.enter(format!("fetch {}", config.from_year));
    let earlier = fetch_year(config, remote, multi, config.from_year).await?;
    stages.enter(format!("fetch {}", config.to_year));
    let later = fetch_year(config, remote, multi, config.to_year).await?;

    if earlier.events.is_empty() || later.events.is_empty() || earlier.total == 0 || later.total == 0
    {
        return Err("Insufficient data to perform comparison".into());
    }

    let options = CleanOptions::within(config.bbox);
    let clean_earlier = clean(&earlier.events, &options);
    let clean_later = clean(&later.events, &options);
    require_events(&clean_earlier)?;
    require_events(&clean_later)?;

    println!(
        "Total valid permits: {} in {}, {} in {}.",
        earlier.total, earlier.year, later.total, later.year
    );
    println!(
        "Using {} and {} valid samples.",
        clean_earlier.len(),
        clean_later.len()
    );

    stages.enter(format!("density on a {0}x{0} grid", config.kde.grid_points));
    let combined = clean_earlier.merged(&clean_later);
    let axes = evaluation_axes(&combined, config.kde.grid_points)?;

    let rule = &config.kde.bandwidth;
    let surface_earlier =
        density_surface(&clean_earlier, &axes, rule)?.scaled(earlier.total as f64);
    let surface_later = density_surface(&clean_later, &axes, rule)?.scaled(later.total as f64);

    stages.enter("compare");
    let difference = compare(&surface_earlier, &surface_later)?;
    log::info!("Largest absolute change: {:.3e}", difference.max_abs);

    let center = combined
        .centroid()
        .ok_or("no coordinates to center the map on")?;
    stages.enter("render");
    render_choropleth(&difference, center, &config.choropleth, output)?;
    stages.finish(format!("max change {:.3e}", difference.max_abs));
    println!("Interactive heatmap saved to '{}'", output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_query_is_a_half_open_range() {
        let query = year_query(&PermitConfig::default(), 2023);
        assert_eq!(
            query.count_sql(),
            "SELECT COUNT(*) AS count FROM \"6ddcd912-32a0-43df-9908-63574f8c7e77\" \
             WHERE \"issued_date\" >= '2023-01-01T00:00:00' \
             AND \"issued_date\" < '2024-01-01T00:00:00'"
        );
        assert!(
            query
                .page_sql(32_000, 64_000)
                .ends_with("ORDER BY \"_id\" LIMIT 32000 OFFSET 64000")
        );
    }
}
