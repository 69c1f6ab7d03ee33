#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Record sources for the hotspot pipelines.
//!
//! A [`RecordSource`] answers a [`RecordQuery`] with raw rows. The remote
//! implementation pages through a CKAN `datastore_search_sql` endpoint; the
//! local one (in `hotspot_database`) runs the same query against a `DuckDB`
//! table. Raw rows are turned into [`Event`]s with a
//! [`FieldMapping`](parsing::FieldMapping).

pub mod ckan;
pub mod paging;
pub mod parsing;
pub mod progress;
pub mod query;
pub mod retry;

use std::sync::Arc;

use async_trait::async_trait;
use hotspot_event_models::{Event, EventSet};

pub use paging::{PagingConfig, StopReason};
pub use query::{Predicate, RecordQuery};
pub use retry::RetryPolicy;

use crate::parsing::FieldMapping;
use crate::progress::FetchProgress;

/// One row as returned by the query service: column name to JSON value.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Errors that can occur while fetching records.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Numeric HTTP status.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The response parsed but lacked the expected fields.
    #[error("Malformed response: {message}")]
    MalformedResponse {
        /// Description of what was missing.
        message: String,
    },

    /// A non-HTTP backend (e.g. a local table) failed.
    #[error("Backend error: {message}")]
    Backend {
        /// Description of what went wrong.
        message: String,
    },
}

impl SourceError {
    /// Returns `true` if retrying the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request()
            }
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Json(_) | Self::Io(_) | Self::MalformedResponse { .. } | Self::Backend { .. } => {
                false
            }
        }
    }
}

/// Executes a single SQL statement against a tabular query service and
/// returns its rows.
///
/// This is the seam between paging logic and the wire: tests substitute an
/// in-memory implementation.
#[async_trait]
pub trait SqlTransport: Send + Sync {
    /// Runs `sql` and returns the resulting rows.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails or the response is
    /// malformed.
    async fn execute(&self, sql: &str) -> Result<Vec<RawRecord>, SourceError>;
}

/// Everything a fetch produced: the rows, how many requests it took, and
/// why it stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchReport {
    /// Accumulated rows in page order.
    pub records: Vec<RawRecord>,
    /// Number of statements sent to the backend.
    pub requests: u32,
    /// Why paging ended.
    pub stop: StopReason,
}

impl FetchReport {
    /// Returns `true` if a failed page cut the fetch short.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.stop.is_truncated()
    }

    /// Converts the rows to events. Unparseable fields become `None`; the
    /// set is flagged as truncated when paging failed part way.
    #[must_use]
    pub fn into_event_set(self, mapping: &FieldMapping, label: &str) -> EventSet {
        let truncated = self.is_truncated();
        let events: Vec<Event> = parsing::records_to_events(&self.records, mapping);
        EventSet::new(label, events).with_truncated(truncated)
    }
}

/// Trait implemented by every record source.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Short identifier used in log messages.
    fn id(&self) -> &str;

    /// Fetches every row matching `query`.
    ///
    /// Page failures do not surface as errors; they end the fetch and are
    /// reported through [`FetchReport::stop`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the query cannot be issued at all.
    async fn fetch(&self, query: &RecordQuery) -> Result<FetchReport, SourceError>;

    /// Counts the rows matching `query` without fetching them.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails or the count cannot be
    /// read from the response.
    async fn count(&self, query: &RecordQuery) -> Result<u64, SourceError>;
}

/// A [`RecordSource`] backed by a paginated remote query service.
pub struct RemoteSource<T: SqlTransport> {
    id: String,
    transport: T,
    paging: PagingConfig,
    progress: Arc<dyn FetchProgress>,
}

impl<T: SqlTransport> RemoteSource<T> {
    /// Creates a source with the default paging policy and no progress
    /// reporting.
    #[must_use]
    pub fn new(id: impl Into<String>, transport: T) -> Self {
        Self {
            id: id.into(),
            transport,
            paging: PagingConfig::default(),
            progress: progress::silent(),
        }
    }

    /// Overrides the paging policy.
    #[must_use]
    pub fn with_paging(mut self, paging: PagingConfig) -> Self {
        self.paging = paging;
        self
    }

    /// Reports page progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn FetchProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// The underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait]
impl<T: SqlTransport> RecordSource for RemoteSource<T> {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(&self, query: &RecordQuery) -> Result<FetchReport, SourceError> {
        log::info!("[{}] fetching {}", self.id, query.resource());
        Ok(paging::fetch_paginated(&self.transport, query, &self.paging, self.progress.as_ref()).await)
    }

    async fn count(&self, query: &RecordQuery) -> Result<u64, SourceError> {
        let total = paging::fetch_count(&self.transport, query).await?;
        log::info!("[{}] {} matching rows in {}", self.id, total, query.resource());
        Ok(total)
    }
}
