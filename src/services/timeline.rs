use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::tracking::{EventType, ProductStatus, SupplyEvent, TrackingRecord};

/// Timeline entry with its display flags
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub status: ProductStatus,
    pub location: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub description: String,
    pub actor: String,
    pub completed: bool,
    pub current: bool,
    /// A connector line is drawn down to the next entry
    pub connector: bool,
}

/// Project a record's events into display order with derived flags.
///
/// Order is the stored order. `current` marks the last completed event only;
/// gaps (a completed event after a pending one) are rendered as they are.
pub fn render(record: &TrackingRecord) -> Vec<AnnotatedEvent> {
    annotate(record.events())
}

pub fn annotate(events: &[SupplyEvent]) -> Vec<AnnotatedEvent> {
    let current_index = events.iter().rposition(SupplyEvent::is_completed);
    let last = events.len().saturating_sub(1);

    events
        .iter()
        .enumerate()
        .map(|(index, event)| AnnotatedEvent {
            id: event.id.clone(),
            event_type: event.event_type,
            status: event.status,
            location: event.location.clone(),
            timestamp: event.timestamp,
            description: event.description.clone(),
            actor: event.actor.clone(),
            completed: event.is_completed(),
            current: current_index == Some(index),
            connector: index < last,
        })
        .collect()
}
