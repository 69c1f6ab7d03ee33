#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Event types shared across the hotspot toolchain.
//!
//! Every record source produces [`Event`]s. They are grouped into an
//! [`EventSet`] which flows read-only through cleaning, aggregation and
//! rendering. Coordinates are optional until the cleaner has run.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// A single observed, geo-tagged record (a crime report, a permit, a 311
/// service request).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// When the event happened. `None` when missing or unparseable.
    pub timestamp: Option<NaiveDateTime>,
    /// Latitude (WGS84).
    pub latitude: Option<f64>,
    /// Longitude (WGS84).
    pub longitude: Option<f64>,
    /// Label such as the offense description or the case title.
    pub category: Option<String>,
    /// Hour of day reported separately from the timestamp. Some datasets
    /// carry this as its own column.
    pub hour: Option<u8>,
}

impl Event {
    /// Creates an event at the given coordinate with no other attributes.
    #[must_use]
    pub const fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            timestamp: None,
            latitude: Some(latitude),
            longitude: Some(longitude),
            category: None,
            hour: None,
        }
    }

    /// Sets the category label.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the explicit hour-of-day.
    #[must_use]
    pub const fn with_hour(mut self, hour: u8) -> Self {
        self.hour = Some(hour);
        self
    }

    /// Sets the timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Returns `(latitude, longitude)` when both are present and finite.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.latitude?;
        let lon = self.longitude?;
        (lat.is_finite() && lon.is_finite()).then_some((lat, lon))
    }

    /// Hour of day in `0..24`.
    ///
    /// The explicit [`Event::hour`] wins; otherwise the hour is taken from
    /// the timestamp.
    #[must_use]
    pub fn hour_of_day(&self) -> Option<u8> {
        match self.hour {
            Some(hour) if hour < 24 => Some(hour),
            Some(_) => None,
            None => self
                .timestamp
                .and_then(|ts| u8::try_from(ts.hour()).ok()),
        }
    }
}

/// An inclusive latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lon: f64,
    /// Eastern edge.
    pub max_lon: f64,
}

impl BoundingBox {
    /// Rough extent of the city of Boston, used to discard geocoding junk
    /// in the permits dataset.
    pub const BOSTON: Self = Self {
        min_lat: 42.2,
        max_lat: 42.4,
        min_lon: -71.2,
        max_lon: -70.9,
    };

    /// Returns `true` if the point lies inside or on the edge of the box.
    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// Smallest box covering every point, or `None` for no points.
    #[must_use]
    pub fn covering(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        points.into_iter().fold(None, |acc: Option<Self>, (lat, lon)| {
            Some(match acc {
                None => Self {
                    min_lat: lat,
                    max_lat: lat,
                    min_lon: lon,
                    max_lon: lon,
                },
                Some(b) => Self {
                    min_lat: b.min_lat.min(lat),
                    max_lat: b.max_lat.max(lat),
                    min_lon: b.min_lon.min(lon),
                    max_lon: b.max_lon.max(lon),
                },
            })
        })
    }
}

/// An ordered collection of events from one source and time range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSet {
    /// Human-readable description (e.g. `"permits 2023"`).
    pub label: String,
    /// The events, in source order.
    pub events: Vec<Event>,
    /// Set when paging stopped early because a page failed to load, so the
    /// set may be missing records.
    pub truncated: bool,
}

impl EventSet {
    /// Creates a complete (non-truncated) set.
    #[must_use]
    pub fn new(label: impl Into<String>, events: Vec<Event>) -> Self {
        Self {
            label: label.into(),
            events,
            truncated: false,
        }
    }

    /// Marks whether the set was truncated by a fetch failure.
    #[must_use]
    pub const fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Iterates over `(latitude, longitude)` of the events that have them.
    pub fn coordinates(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.events.iter().filter_map(Event::coordinates)
    }

    /// Bounding box of all coordinates in the set.
    #[must_use]
    pub fn extent(&self) -> Option<BoundingBox> {
        BoundingBox::covering(self.coordinates())
    }

    /// Mean `(latitude, longitude)` of the set, used to center maps.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn centroid(&self) -> Option<(f64, f64)> {
        let (sum_lat, sum_lon, n) = self
            .coordinates()
            .fold((0.0, 0.0, 0usize), |(a, b, n), (lat, lon)| {
                (a + lat, b + lon, n + 1)
            });
        (n > 0).then(|| (sum_lat / n as f64, sum_lon / n as f64))
    }

    /// Union of two sets. The result is truncated if either input was.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut events = Vec::with_capacity(self.len() + other.len());
        events.extend_from_slice(&self.events);
        events.extend_from_slice(&other.events);
        Self {
            label: format!("{} + {}", self.label, other.label),
            events,
            truncated: self.truncated || other.truncated,
        }
    }
}

impl<'a> IntoIterator for &'a EventSet {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
