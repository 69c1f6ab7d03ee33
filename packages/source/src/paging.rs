//! Offset pagination over a [`SqlTransport`].
//!
//! Pages are requested with a fixed size and a stable sort key until the
//! service returns an empty page. A failed page ends paging without failing
//! the run; the rows gathered so far are kept and the failure is reported
//! through [`StopReason::FetchFailed`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::progress::FetchProgress;
use crate::query::RecordQuery;
use crate::{RawRecord, RetryPolicy, SourceError, SqlTransport};

/// Paging policy for remote fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    /// Rows requested per page. The Boston datastore caps a single
    /// response at 32,000 rows.
    pub page_size: u64,
    /// Paging stops once more than this many rows have accumulated.
    pub max_records: u64,
    /// Pause between page requests, in seconds.
    pub page_delay_secs: f64,
    /// Retry policy applied to each request.
    pub retry: RetryPolicy,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: 32_000,
            max_records: 50_000,
            page_delay_secs: 1.0,
            retry: RetryPolicy::default(),
        }
    }
}

impl PagingConfig {
    /// The inter-page pause as a [`Duration`].
    #[must_use]
    pub fn page_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.page_delay_secs).unwrap_or(Duration::ZERO)
    }
}

/// Why a paged fetch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The service returned an empty page.
    Exhausted,
    /// More than `limit` rows were accumulated.
    RecordCap {
        /// The configured cap.
        limit: u64,
    },
    /// A page request failed; rows from earlier pages were kept.
    FetchFailed {
        /// Offset of the page that failed.
        offset: u64,
        /// The error message.
        message: String,
    },
}

impl StopReason {
    /// Returns `true` when rows may be missing because of a failure.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        matches!(self, Self::FetchFailed { .. })
    }
}

/// Pages through `query` until an empty page, the record cap, or a failed
/// request.
pub async fn fetch_paginated(
    transport: &dyn SqlTransport,
    query: &RecordQuery,
    config: &PagingConfig,
    progress: &dyn FetchProgress,
) -> crate::FetchReport {
    let delay = config.page_delay();
    let mut records: Vec<RawRecord> = Vec::new();
    let mut offset: u64 = 0;
    let mut requests: u32 = 0;

    progress.started(query.resource(), config.max_records);

    let stop = loop {
        let sql = query.page_sql(config.page_size, offset);
        requests += 1;

        let page = match transport.execute(&sql).await {
            Ok(page) => page,
            Err(e) => {
                log::error!("Error at offset {offset}: {e}");
                break StopReason::FetchFailed {
                    offset,
                    message: e.to_string(),
                };
            }
        };

        if page.is_empty() {
            break StopReason::Exhausted;
        }

        let count = page.len() as u64;
        records.extend(page);
        log::info!("Fetched {count} records (offset {offset})");
        progress.page(offset, count);
        offset += config.page_size;

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if records.len() as u64 > config.max_records {
            log::warn!(
                "Max record limit ({}) reached; stopping early.",
                config.max_records
            );
            break StopReason::RecordCap {
                limit: config.max_records,
            };
        }
    };

    if stop.is_truncated() {
        log::warn!(
            "Fetch of {} truncated after {} records",
            query.resource(),
            records.len()
        );
    }
    log::info!("Fetched total {} records from {}", records.len(), query.resource());
    progress.stopped(records.len() as u64, &stop);

    crate::FetchReport {
        records,
        requests,
        stop,
    }
}

/// Runs the count statement for `query` and reads the single `count` value.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails or the response has no
/// readable count.
pub async fn fetch_count(
    transport: &dyn SqlTransport,
    query: &RecordQuery,
) -> Result<u64, SourceError> {
    let rows = transport.execute(&query.count_sql()).await?;
    parse_count(&rows)
}

/// Reads `rows[0]["count"]`, which the datastore returns as a numeric
/// string (`[{"count": "35000"}]`) and other backends as a number.
///
/// # Errors
///
/// Returns [`SourceError::MalformedResponse`] if the value is missing or not
/// a non-negative integer.
pub fn parse_count(rows: &[RawRecord]) -> Result<u64, SourceError> {
    let value = rows
        .first()
        .and_then(|row| row.get("count"))
        .ok_or_else(|| SourceError::MalformedResponse {
            message: "count query returned no `count` field".to_string(),
        })?;

    let parsed = match value {
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        serde_json::Value::Number(n) => n.as_u64(),
        _ => None,
    };

    parsed.ok_or_else(|| SourceError::MalformedResponse {
        message: format!("unreadable count value: {value}"),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::progress::Silent;

    /// Serves pre-scripted pages and records every statement it receives.
    struct ScriptedTransport {
        pages: Mutex<VecDeque<Result<Vec<RawRecord>, SourceError>>>,
        statements: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(pages: Vec<Result<Vec<RawRecord>, SourceError>>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                statements: Mutex::new(Vec::new()),
            }
        }

        fn statements(&self) -> Vec<String> {
            self.statements.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SqlTransport for ScriptedTransport {
        async fn execute(&self, sql: &str) -> Result<Vec<RawRecord>, SourceError> {
            self.statements.lock().unwrap().push(sql.to_string());
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn rows(n: usize) -> Vec<RawRecord> {
        (0..n)
            .map(|i| {
                let mut row = RawRecord::new();
                row.insert("_id".to_string(), json!(i));
                row
            })
            .collect()
    }

    fn config(page_size: u64, max_records: u64) -> PagingConfig {
        PagingConfig {
            page_size,
            max_records,
            page_delay_secs: 0.0,
            retry: RetryPolicy::default(),
        }
    }

    #[tokio::test]
    async fn accumulates_until_empty_page() {
        let transport = ScriptedTransport::new(vec![Ok(rows(1000)), Ok(rows(1000)), Ok(rows(0))]);
        let query = RecordQuery::new("res");

        let report =
            fetch_paginated(&transport, &query, &config(1000, 1_000_000), &Silent).await;

        assert_eq!(report.records.len(), 2000);
        assert_eq!(report.requests, 3);
        assert_eq!(report.stop, StopReason::Exhausted);
        assert!(!report.is_truncated());

        let statements = transport.statements();
        assert_eq!(statements.len(), 3);
        assert!(statements[0].ends_with("ORDER BY \"_id\" LIMIT 1000 OFFSET 0"));
        assert!(statements[1].ends_with("LIMIT 1000 OFFSET 1000"));
        assert!(statements[2].ends_with("LIMIT 1000 OFFSET 2000"));
    }

    #[derive(Default)]
    struct RecordingProgress {
        seen: Mutex<Vec<String>>,
    }

    impl FetchProgress for RecordingProgress {
        fn started(&self, resource: &str, cap: u64) {
            self.seen.lock().unwrap().push(format!("start {resource} {cap}"));
        }

        fn page(&self, offset: u64, rows: u64) {
            self.seen.lock().unwrap().push(format!("page {offset} {rows}"));
        }

        fn stopped(&self, total: u64, stop: &StopReason) {
            self.seen.lock().unwrap().push(format!("stop {total} {stop:?}"));
        }
    }

    #[tokio::test]
    async fn reports_each_page_and_the_stop_reason() {
        let transport = ScriptedTransport::new(vec![Ok(rows(10)), Ok(rows(4)), Ok(rows(0))]);
        let progress = RecordingProgress::default();

        fetch_paginated(&transport, &RecordQuery::new("res"), &config(10, 100), &progress).await;

        assert_eq!(
            *progress.seen.lock().unwrap(),
            vec![
                "start res 100".to_string(),
                "page 0 10".to_string(),
                "page 10 4".to_string(),
                "stop 14 Exhausted".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_between_pages_but_not_after_the_empty_one() {
        let transport = ScriptedTransport::new(vec![Ok(rows(1000)), Ok(rows(1000)), Ok(rows(0))]);
        let query = RecordQuery::new("res");
        let paging = PagingConfig {
            page_delay_secs: 1.5,
            ..config(1000, 1_000_000)
        };

        let started = tokio::time::Instant::now();
        let report = fetch_paginated(&transport, &query, &paging, &Silent).await;
        let elapsed = started.elapsed();

        assert_eq!(report.records.len(), 2000);
        assert_eq!(report.requests, 3);
        assert!(elapsed >= Duration::from_secs(3), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(3100), "{elapsed:?}");
    }

    #[tokio::test]
    async fn stops_once_cap_is_exceeded() {
        let transport =
            ScriptedTransport::new(vec![Ok(rows(10)), Ok(rows(10)), Ok(rows(10)), Ok(rows(10))]);
        let query = RecordQuery::new("res");

        let report = fetch_paginated(&transport, &query, &config(10, 15), &Silent).await;

        assert_eq!(report.records.len(), 20);
        assert_eq!(report.requests, 2);
        assert_eq!(report.stop, StopReason::RecordCap { limit: 15 });
    }

    #[tokio::test]
    async fn failed_page_truncates_and_keeps_earlier_rows() {
        let transport = ScriptedTransport::new(vec![
            Ok(rows(5)),
            Err(SourceError::Status {
                status: 503,
                url: "http://example.invalid".to_string(),
            }),
            Ok(rows(5)),
        ]);
        let query = RecordQuery::new("res");

        let report = fetch_paginated(&transport, &query, &config(5, 100), &Silent).await;

        assert_eq!(report.records.len(), 5);
        assert_eq!(report.requests, 2);
        assert!(report.is_truncated());
        assert!(matches!(report.stop, StopReason::FetchFailed { offset: 5, .. }));

        let set = report.into_event_set(&crate::parsing::FieldMapping::default(), "res");
        assert!(set.truncated);
        assert_eq!(set.len(), 5);
    }

    #[tokio::test]
    async fn count_reads_numeric_string() {
        let mut row = RawRecord::new();
        row.insert("count".to_string(), json!("35000"));
        let transport = ScriptedTransport::new(vec![Ok(vec![row])]);

        let total = fetch_count(&transport, &RecordQuery::new("res")).await.unwrap();
        assert_eq!(total, 35_000);
        assert!(transport.statements()[0].starts_with("SELECT COUNT(*) AS count"));
    }

    #[test]
    fn count_accepts_number_and_rejects_garbage() {
        let mut row = RawRecord::new();
        row.insert("count".to_string(), json!(12));
        assert_eq!(parse_count(&[row]).unwrap(), 12);

        let mut row = RawRecord::new();
        row.insert("count".to_string(), json!("many"));
        assert!(matches!(
            parse_count(&[row]),
            Err(SourceError::MalformedResponse { .. })
        ));

        assert!(parse_count(&[]).is_err());
    }
}
