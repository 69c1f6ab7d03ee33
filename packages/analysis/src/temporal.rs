//! Per-day event counts for trend plots.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use hotspot_analysis_models::DailyCount;
use hotspot_event_models::Event;

/// Counts events per calendar day, ascending by date. Events without a
/// timestamp are skipped.
pub fn daily_counts<'a>(events: impl IntoIterator<Item = &'a Event>) -> Vec<DailyCount> {
    let mut by_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    let mut skipped = 0usize;
    for event in events {
        match event.timestamp {
            Some(ts) => *by_day.entry(ts.date()).or_default() += 1,
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        log::info!("Skipped {skipped} events without a timestamp");
    }
    by_day
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use hotspot_event_models::EventSet;

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> Event {
        Event {
            timestamp: NaiveDate::from_ymd_opt(y, m, d).and_then(|date| date.and_hms_opt(h, 0, 0)),
            ..Event::default()
        }
    }

    #[test]
    fn groups_by_date_in_order() {
        let a = EventSet::new("2024", vec![at(2024, 1, 2, 9), at(2024, 1, 1, 23), at(2024, 1, 2, 1)]);
        let b = EventSet::new("2023", vec![at(2023, 12, 31, 12), Event::default()]);
        let counts = daily_counts(a.iter().chain(b.iter()));

        let dates: Vec<String> = counts.iter().map(|c| c.date.to_string()).collect();
        assert_eq!(dates, vec!["2023-12-31", "2024-01-01", "2024-01-02"]);
        assert_eq!(
            counts.iter().map(|c| c.count).collect::<Vec<_>>(),
            vec![1, 1, 2]
        );
    }

    #[test]
    fn empty_input_gives_empty_series() {
        assert!(daily_counts(&EventSet::default()).is_empty());
    }
}
