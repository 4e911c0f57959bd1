//! Events catalog: real-world occurrences candidate for explaining breaks.

use crate::error::{AnalysisError, Result};
use chrono::NaiveDate;
use serde::Serialize;

/// A real-world event that may explain a structural break.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub date: NaiveDate,
    pub name: String,
    pub category: String,
    pub description: String,
    /// Qualitative impact on a small bounded scale (1..=10 upstream).
    pub impact_score: u8,
    pub region: String,
}

impl Event {
    /// Parse an event from catalog row fields
    /// (date, name, category, description, impact score, region).
    pub fn from_fields(
        date: &str,
        date_format: &str,
        name: &str,
        category: &str,
        description: &str,
        impact_score: &str,
        region: &str,
    ) -> Result<Self> {
        let date = NaiveDate::parse_from_str(date, date_format)
            .map_err(|e| AnalysisError::Data(format!("bad event date {date:?}: {e}")))?;
        let impact_score = impact_score
            .trim()
            .parse::<u8>()
            .map_err(|e| AnalysisError::Data(format!("bad impact score {impact_score:?}: {e}")))?;
        Ok(Self {
            date,
            name: name.to_string(),
            category: category.to_string(),
            description: description.to_string(),
            impact_score,
            region: region.to_string(),
        })
    }
}

/// An ordered events catalog.
///
/// Input order is preserved and used as the tie-break when ranking events
/// at equal day distance from a change point.
#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    events: Vec<Event>,
}

impl EventCatalog {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Distinct categories in catalog order.
    pub fn categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for event in &self.events {
            if !out.contains(&event.category.as_str()) {
                out.push(&event.category);
            }
        }
        out
    }
}
