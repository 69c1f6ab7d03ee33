#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the hotspot binary.
//!
//! [`init_logger`] installs `pretty_env_logger` behind `indicatif-log-bridge`
//! so log lines are suspended while bars redraw. [`FetchBar`] draws one
//! paged download and [`StageBar`] walks a pipeline through its named
//! stages.

use std::sync::Arc;

use hotspot_source::StopReason;
use hotspot_source::progress::FetchProgress;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

const FETCH_TEMPLATE: &str =
    "{prefix:.bold} {wide_bar:.cyan/dim} {human_pos}/{human_len} rows {msg} [{elapsed_precise}]";
const STAGE_TEMPLATE: &str = "{prefix:.bold.green} [{pos}/{len}] {msg}";

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

/// One-line outcome of a paged fetch.
#[must_use]
pub fn stop_summary(total: u64, stop: &StopReason) -> String {
    match stop {
        StopReason::Exhausted => format!("{total} rows, complete"),
        StopReason::RecordCap { limit } => format!("{total} rows, capped past {limit}"),
        StopReason::FetchFailed { offset, .. } => {
            format!("{total} rows, truncated at offset {offset}")
        }
    }
}

/// Row counter for one paged fetch, sized to the record cap.
pub struct FetchBar {
    bar: ProgressBar,
}

impl FetchBar {
    /// Adds a bar labelled `label` to `multi`.
    #[must_use]
    pub fn new(multi: &MultiProgress, label: &str) -> Arc<dyn FetchProgress> {
        let bar = multi.add(ProgressBar::new(0));
        bar.set_style(style(FETCH_TEMPLATE));
        bar.set_prefix(label.to_string());
        Arc::new(Self { bar })
    }
}

impl FetchProgress for FetchBar {
    fn started(&self, resource: &str, cap: u64) {
        self.bar.set_length(cap);
        self.bar.set_position(0);
        self.bar.set_message(format!("from {resource}"));
    }

    fn page(&self, offset: u64, rows: u64) {
        self.bar.inc(rows);
        self.bar.set_message(format!("offset {offset}"));
    }

    fn stopped(&self, total: u64, stop: &StopReason) {
        let summary = stop_summary(total, stop);
        if stop.is_truncated() {
            self.bar.abandon_with_message(summary);
        } else {
            self.bar.finish_with_message(summary);
        }
    }
}

/// Steps a pipeline through a fixed number of named stages.
pub struct StageBar {
    bar: ProgressBar,
}

impl StageBar {
    /// Adds a bar for `stages` stages under `label`.
    #[must_use]
    pub fn new(multi: &MultiProgress, label: &str, stages: u64) -> Self {
        let bar = multi.add(ProgressBar::new(stages));
        bar.set_style(style(STAGE_TEMPLATE));
        bar.set_prefix(label.to_string());
        Self { bar }
    }

    /// Shows `stage` as the one in progress. The previous stage counts as
    /// done.
    pub fn enter(&self, stage: impl Into<String>) {
        if self.bar.message().is_empty() {
            self.bar.set_position(0);
        } else {
            self.bar.inc(1);
        }
        self.bar.set_message(stage.into());
    }

    /// Marks every stage done.
    pub fn finish(&self, summary: impl Into<String>) {
        if let Some(len) = self.bar.length() {
            self.bar.set_position(len);
        }
        self.bar.finish_with_message(summary.into());
    }

    /// Stages completed so far.
    #[must_use]
    pub fn completed(&self) -> u64 {
        self.bar.position()
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge`.
///
/// Logs at `info` unless `RUST_LOG` says otherwise. Returns the
/// [`MultiProgress`] that every bar must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // Already set when called twice (tests).
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}

#[cfg(test)]
mod tests {
    use indicatif::ProgressDrawTarget;

    use super::*;

    fn hidden() -> MultiProgress {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    }

    #[test]
    fn summaries_name_the_stop_reason() {
        assert_eq!(stop_summary(2000, &StopReason::Exhausted), "2000 rows, complete");
        assert_eq!(
            stop_summary(64_000, &StopReason::RecordCap { limit: 50_000 }),
            "64000 rows, capped past 50000"
        );
        assert_eq!(
            stop_summary(
                32_000,
                &StopReason::FetchFailed {
                    offset: 32_000,
                    message: "503".to_string(),
                }
            ),
            "32000 rows, truncated at offset 32000"
        );
    }

    #[test]
    fn stage_bar_counts_finished_stages() {
        let stages = StageBar::new(&hidden(), "permits", 3);
        stages.enter("fetch 2023");
        assert_eq!(stages.completed(), 0);
        stages.enter("fetch 2024");
        stages.enter("density");
        assert_eq!(stages.completed(), 2);
        stages.finish("done");
        assert_eq!(stages.completed(), 3);
    }

    #[test]
    fn fetch_bar_tracks_rows() {
        let multi = hidden();
        let bar = multi.add(ProgressBar::new(0));
        let fetch = FetchBar { bar: bar.clone() };
        fetch.started("res", 50_000);
        fetch.page(0, 32_000);
        fetch.page(32_000, 100);
        fetch.stopped(32_100, &StopReason::Exhausted);
        assert_eq!(bar.position(), 32_100);
        assert_eq!(bar.length(), Some(50_000));
        assert!(bar.is_finished());
    }
}
