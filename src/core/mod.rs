//! Core data structures: prepared price series and events catalog.

mod event;
mod series;

pub use event::{Event, EventCatalog};
pub use series::{prepare_series, PriceSeries, RawRecord, SeriesSummary};
