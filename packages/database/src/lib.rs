#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Local relational storage for raw records.
//!
//! A row-oriented CSV export is loaded into a `DuckDB` table and queried
//! back with the same [`RecordQuery`](hotspot_source::RecordQuery) the remote
//! source uses, so local and remote pipelines share everything downstream.

pub mod local_table;

pub use local_table::{LocalTable, LocalTableSource};

/// Errors that can occur during local table operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record source error.
    #[error("Source error: {0}")]
    Source(#[from] hotspot_source::SourceError),
}
