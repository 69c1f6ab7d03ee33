//! Conversion of raw rows into [`Event`]s.
//!
//! Field values are coerced rather than validated: anything that does not
//! parse becomes `None` and is dealt with by the cleaner.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use hotspot_event_models::Event;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::RawRecord;

/// Matches `"(42.35, -71.06)"`, with or without parentheses.
static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(?\s*([-\d\.]+)\s*,\s*([-\d\.]+)\s*\)?").expect("valid regex")
});

/// Names the columns of a dataset that carry each event attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    /// Latitude column.
    pub latitude: Option<String>,
    /// Longitude column.
    pub longitude: Option<String>,
    /// Combined `"(lat, lon)"` column, used when the separate columns are
    /// absent or empty.
    pub location: Option<String>,
    /// Timestamp column.
    pub timestamp: Option<String>,
    /// Category label column.
    pub category: Option<String>,
    /// Hour-of-day column.
    pub hour: Option<String>,
}

impl FieldMapping {
    /// Mapping with separate latitude and longitude columns.
    #[must_use]
    pub fn lat_lon(latitude: &str, longitude: &str) -> Self {
        Self {
            latitude: Some(latitude.to_string()),
            longitude: Some(longitude.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_location(mut self, column: &str) -> Self {
        self.location = Some(column.to_string());
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, column: &str) -> Self {
        self.timestamp = Some(column.to_string());
        self
    }

    #[must_use]
    pub fn with_category(mut self, column: &str) -> Self {
        self.category = Some(column.to_string());
        self
    }

    #[must_use]
    pub fn with_hour(mut self, column: &str) -> Self {
        self.hour = Some(column.to_string());
        self
    }
}

/// Converts every row with [`record_to_event`].
#[must_use]
pub fn records_to_events(records: &[RawRecord], mapping: &FieldMapping) -> Vec<Event> {
    records.iter().map(|r| record_to_event(r, mapping)).collect()
}

/// Converts one row. Missing columns and unparseable values yield `None`
/// for the corresponding attribute.
#[must_use]
pub fn record_to_event(record: &RawRecord, mapping: &FieldMapping) -> Event {
    let field = |column: &Option<String>| column.as_deref().and_then(|c| record.get(c));

    let mut latitude = field(&mapping.latitude).and_then(parse_f64);
    let mut longitude = field(&mapping.longitude).and_then(parse_f64);

    if latitude.is_none() || longitude.is_none() {
        if let Some((lat, lon)) = field(&mapping.location)
            .and_then(Value::as_str)
            .and_then(parse_location)
        {
            latitude = Some(lat);
            longitude = Some(lon);
        }
    }

    Event {
        timestamp: field(&mapping.timestamp)
            .and_then(Value::as_str)
            .and_then(parse_timestamp),
        latitude,
        longitude,
        category: field(&mapping.category).and_then(value_to_label),
        hour: field(&mapping.hour).and_then(parse_hour),
    }
}

/// Reads a finite float from a JSON number or a numeric string.
#[must_use]
pub fn parse_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Reads an hour of day (`0..24`) from `7`, `7.0`, `"7"`, or `"07"`.
#[must_use]
pub fn parse_hour(value: &Value) -> Option<u8> {
    let hour = parse_f64(value)?;
    if hour.fract() != 0.0 || !(0.0..24.0).contains(&hour) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some(hour as u8)
}

/// Parses the timestamp layouts seen in the Boston datasets:
/// `2023-01-05T14:30:00`, `2023-01-05 14:30:00.000`,
/// `2023-01-05 14:30:00+00`, and bare dates.
///
/// Offsets are dropped; the local wall-clock time is kept.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.naive_local());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Extracts `(latitude, longitude)` from a combined location string.
#[must_use]
pub fn parse_location(s: &str) -> Option<(f64, f64)> {
    let caps = LOCATION_RE.captures(s)?;
    let lat = caps.get(1)?.as_str().parse::<f64>().ok()?;
    let lon = caps.get(2)?.as_str().parse::<f64>().ok()?;
    (lat.is_finite() && lon.is_finite()).then_some((lat, lon))
}

fn value_to_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
