//! Coordinate and timestamp validation.

use hotspot_event_models::{BoundingBox, Event, EventSet};
use serde::{Deserialize, Serialize};

use crate::AnalysisError;

/// What the cleaner enforces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanOptions {
    /// Drop events outside this box (edges inclusive).
    pub bbox: Option<BoundingBox>,
    /// Drop events without a timestamp.
    pub require_timestamp: bool,
}

impl CleanOptions {
    /// Options restricting events to `bbox`.
    #[must_use]
    pub const fn within(bbox: BoundingBox) -> Self {
        Self {
            bbox: Some(bbox),
            require_timestamp: false,
        }
    }
}

fn keep(event: &Event, options: &CleanOptions) -> bool {
    let Some((lat, lon)) = event.coordinates() else {
        return false;
    };
    if options.require_timestamp && event.timestamp.is_none() {
        return false;
    }
    options.bbox.is_none_or(|b| b.contains(lat, lon))
}

/// Drops events without finite coordinates, without a timestamp when one
/// is required, and outside the bounding box.
///
/// Order is preserved and the truncation flag carries over, so applying the
/// cleaner twice gives the same result as applying it once.
#[must_use]
pub fn clean(events: &EventSet, options: &CleanOptions) -> EventSet {
    let kept: Vec<Event> = events
        .iter()
        .filter(|e| keep(e, options))
        .cloned()
        .collect();

    let dropped = events.len() - kept.len();
    if dropped > 0 {
        log::info!(
            "Cleaning {}: kept {} of {} rows ({dropped} dropped)",
            events.label,
            kept.len(),
            events.len()
        );
    }

    EventSet {
        label: events.label.clone(),
        events: kept,
        truncated: events.truncated,
    }
}

/// Fails with [`AnalysisError::DataQuality`] when `events` is empty.
///
/// # Errors
///
/// Returns [`AnalysisError::DataQuality`] for an empty set.
pub fn require_events(events: &EventSet) -> Result<(), AnalysisError> {
    if events.is_empty() {
        return Err(AnalysisError::data_quality(format!(
            "no usable rows in {}",
            events.label
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn messy() -> EventSet {
        let ts = NaiveDate::from_ymd_opt(2023, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        EventSet::new(
            "permits",
            vec![
                Event::at(42.30, -71.05).with_timestamp(ts),
                Event::at(42.30, -71.05),
                Event {
                    latitude: None,
                    ..Event::at(0.0, -71.0)
                },
                Event {
                    longitude: None,
                    ..Event::at(42.3, 0.0)
                },
                Event::at(f64::NAN, -71.0),
                Event::at(41.0, -71.05).with_timestamp(ts),
                Event::at(42.2, -71.2).with_timestamp(ts),
            ],
        )
    }

    #[test]
    fn drops_missing_coordinates() {
        let cleaned = clean(&messy(), &CleanOptions::default());
        assert_eq!(cleaned.len(), 4);
        assert!(cleaned.iter().all(|e| e.coordinates().is_some()));
    }

    #[test]
    fn applies_bounding_box() {
        let cleaned = clean(&messy(), &CleanOptions::within(BoundingBox::BOSTON));
        assert_eq!(cleaned.len(), 3);
        assert!(
            cleaned
                .coordinates()
                .all(|(lat, lon)| BoundingBox::BOSTON.contains(lat, lon))
        );
    }

    #[test]
    fn requires_timestamp_when_asked() {
        let options = CleanOptions {
            bbox: None,
            require_timestamp: true,
        };
        let cleaned = clean(&messy(), &options);
        assert_eq!(cleaned.len(), 3);
        assert!(cleaned.iter().all(|e| e.timestamp.is_some()));
    }

    #[test]
    fn is_idempotent() {
        for options in [
            CleanOptions::default(),
            CleanOptions::within(BoundingBox::BOSTON),
            CleanOptions {
                bbox: Some(BoundingBox::BOSTON),
                require_timestamp: true,
            },
        ] {
            let once = clean(&messy(), &options);
            let twice = clean(&once, &options);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn keeps_truncation_flag() {
        let cleaned = clean(&messy().with_truncated(true), &CleanOptions::default());
        assert!(cleaned.truncated);
    }

    #[test]
    fn empty_after_cleaning_is_a_data_quality_error() {
        let set = EventSet::new("x", vec![Event::default()]);
        let cleaned = clean(&set, &CleanOptions::default());
        assert!(matches!(
            require_events(&cleaned),
            Err(AnalysisError::DataQuality { .. })
        ));
    }
}
