//! `hotspot needle-timeseries`: daily 311 needle pickup requests.

use std::path::Path;

use hotspot_analysis::temporal::daily_counts;
use hotspot_cli_utils::{MultiProgress, StageBar};
use hotspot_event_models::EventSet;
use hotspot_render::timeseries::render_daily_series;
use hotspot_source::parsing::FieldMapping;
use hotspot_source::{PagingConfig, RecordQuery, RecordSource};

use crate::config::{NeedleConfig, RemoteConfig};
use crate::pipelines::remote_source;

/// Open dates of requests with the configured case title in `resource`.
pub fn resource_query(config: &NeedleConfig, resource: &str) -> RecordQuery {
    RecordQuery::new(resource)
        .select([&config.date_column])
        .where_equals(config.title_column.as_str(), config.case_title.as_str())
}

pub async fn run(
    config: &NeedleConfig,
    remote: &RemoteConfig,
    output: &Path,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let paging = PagingConfig {
        max_records: config.max_records,
        ..remote.paging.clone()
    };
    let mapping = FieldMapping::default().with_timestamp(&config.date_column);
    let stages = StageBar::new(
        multi,
        "needle-timeseries",
        u64::try_from(config.resources.len()).unwrap_or(u64::MAX) + 1,
    );

    let mut events = Vec::new();
    let mut truncated = false;
    for (n, resource) in config.resources.iter().enumerate() {
        stages.enter(format!("resource {} of {}", n + 1, config.resources.len()));
        let source = remote_source(remote, paging.clone(), multi, resource);
        let set = source
            .fetch(&resource_query(config, resource))
            .await?
            .into_event_set(&mapping, resource);
        log::info!("{} '{}' requests in {resource}", set.len(), config.case_title);
        truncated |= set.truncated;
        events.extend(set.events);
    }
    stages.enter("plot");

    let all = EventSet::new(config.case_title.as_str(), events).with_truncated(truncated);
    let series = daily_counts(&all);
    let dated: u64 = series.iter().map(|d| d.count).sum();
    let undated = u64::try_from(all.len())
        .unwrap_or(u64::MAX)
        .saturating_sub(dated);
    if undated > 0 {
        log::warn!("{undated} requests without a readable {}", config.date_column);
    }

    render_daily_series(&series, &config.chart, output)?;
    stages.finish(format!("{} requests over {} days", all.len(), series.len()));
    println!("Time series saved to {}", output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_filters_on_case_title() {
        let config = NeedleConfig::default();
        let query = resource_query(&config, "e6013a93-1321-4f2a-bf91-8d8a02f1e62f");
        assert_eq!(
            query.page_sql(32_000, 0),
            "SELECT \"open_dt\" FROM \"e6013a93-1321-4f2a-bf91-8d8a02f1e62f\" \
             WHERE \"case_title\" = 'Needle Pickup' \
             ORDER BY \"_id\" LIMIT 32000 OFFSET 0"
        );
    }
}
