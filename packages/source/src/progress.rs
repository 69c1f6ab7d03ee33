//! Page-level notifications from a paged fetch.
//!
//! The terminal bar lives in the binary; library code and tests use
//! [`Silent`].

use std::sync::Arc;

use crate::StopReason;

/// Observes one paged fetch from first request to stop.
pub trait FetchProgress: Send + Sync {
    /// Paging of `resource` begins. Paging stops once more than `cap` rows
    /// have arrived.
    fn started(&self, resource: &str, cap: u64);

    /// A non-empty page of `rows` rows arrived from `offset`.
    fn page(&self, offset: u64, rows: u64);

    /// Paging ended after `total` rows.
    fn stopped(&self, total: u64, stop: &StopReason);
}

/// Ignores every notification.
pub struct Silent;

impl FetchProgress for Silent {
    fn started(&self, _resource: &str, _cap: u64) {}
    fn page(&self, _offset: u64, _rows: u64) {}
    fn stopped(&self, _total: u64, _stop: &StopReason) {}
}

#[must_use]
pub fn silent() -> Arc<dyn FetchProgress> {
    Arc::new(Silent)
}
