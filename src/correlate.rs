//! Temporal correlation of change points with catalog events.

use crate::core::{Event, EventCatalog};
use chrono::NaiveDate;
use serde::Serialize;

/// Default day window for event correlation.
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// One event within the correlation window of a change point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventMatch {
    pub event: Event,
    /// Signed offset in days, `event_date - change_point_date`: an event
    /// 10 days after the break reports +10.
    pub days_offset: i64,
}

/// Events correlated with one change point, closest first.
///
/// An empty match list is an explicit "no correlation" result, never an
/// error.
#[derive(Debug, Clone, Serialize)]
pub struct EventCorrelation {
    pub changepoint: NaiveDate,
    pub matches: Vec<EventMatch>,
}

impl EventCorrelation {
    /// The closest matching event, if any.
    pub fn best(&self) -> Option<&EventMatch> {
        self.matches.first()
    }
}

/// Correlate each change point with catalog events no further than
/// `window_days` away (boundary inclusive).
///
/// Matches are ranked ascending by absolute day distance; ties keep the
/// catalog's order. Pure filter-and-sort, no scoring beyond distance.
pub fn correlate_events(
    changepoints: &[NaiveDate],
    catalog: &EventCatalog,
    window_days: i64,
) -> Vec<EventCorrelation> {
    changepoints
        .iter()
        .map(|&cp| {
            let mut matches: Vec<EventMatch> = catalog
                .events()
                .iter()
                .filter_map(|event| {
                    let offset = event.date.signed_duration_since(cp).num_days();
                    (offset.abs() <= window_days).then(|| EventMatch {
                        event: event.clone(),
                        days_offset: offset,
                    })
                })
                .collect();
            // Stable, so catalog order breaks distance ties.
            matches.sort_by_key(|m| m.days_offset.abs());
            EventCorrelation {
                changepoint: cp,
                matches,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(name: &str, when: NaiveDate) -> Event {
        Event {
            date: when,
            name: name.to_string(),
            category: "Test".to_string(),
            description: String::new(),
            impact_score: 5,
            region: "Global".to_string(),
        }
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let cp = date(2020, 6, 1);
        let catalog = EventCatalog::new(vec![
            event("at-30", cp + chrono::Duration::days(30)),
            event("at-31", cp + chrono::Duration::days(31)),
            event("at-minus-30", cp - chrono::Duration::days(30)),
        ]);

        let correlations = correlate_events(&[cp], &catalog, 30);
        let names: Vec<&str> = correlations[0]
            .matches
            .iter()
            .map(|m| m.event.name.as_str())
            .collect();
        assert_eq!(names, vec!["at-30", "at-minus-30"]);
    }

    #[test]
    fn offset_sign_follows_event_minus_changepoint() {
        let cp = date(2020, 6, 1);
        let catalog = EventCatalog::new(vec![event("after", cp + chrono::Duration::days(10))]);

        let correlations = correlate_events(&[cp], &catalog, 30);
        assert_eq!(correlations[0].matches.len(), 1);
        assert_eq!(correlations[0].matches[0].days_offset, 10);

        let catalog = EventCatalog::new(vec![event("before", cp - chrono::Duration::days(10))]);
        let correlations = correlate_events(&[cp], &catalog, 30);
        assert_eq!(correlations[0].matches[0].days_offset, -10);
    }

    #[test]
    fn ranked_by_distance_with_catalog_order_ties() {
        let cp = date(2020, 6, 1);
        let catalog = EventCatalog::new(vec![
            event("far", cp + chrono::Duration::days(20)),
            event("tie-first", cp - chrono::Duration::days(5)),
            event("tie-second", cp + chrono::Duration::days(5)),
            event("near", cp + chrono::Duration::days(1)),
        ]);

        let correlations = correlate_events(&[cp], &catalog, 30);
        let names: Vec<&str> = correlations[0]
            .matches
            .iter()
            .map(|m| m.event.name.as_str())
            .collect();
        assert_eq!(names, vec!["near", "tie-first", "tie-second", "far"]);
        assert_eq!(correlations[0].best().unwrap().event.name, "near");
    }

    #[test]
    fn no_matches_is_a_valid_result() {
        let cp = date(2020, 6, 1);
        let catalog = EventCatalog::new(vec![event("distant", date(2021, 6, 1))]);

        let correlations = correlate_events(&[cp], &catalog, 30);
        assert_eq!(correlations.len(), 1);
        assert!(correlations[0].matches.is_empty());
        assert!(correlations[0].best().is_none());
    }

    #[test]
    fn one_correlation_per_changepoint() {
        let cps = vec![date(2020, 1, 1), date(2020, 6, 1), date(2020, 12, 1)];
        let catalog = EventCatalog::default();
        let correlations = correlate_events(&cps, &catalog, 30);
        assert_eq!(correlations.len(), 3);
        for (corr, cp) in correlations.iter().zip(&cps) {
            assert_eq!(corr.changepoint, *cp);
        }
    }
}
