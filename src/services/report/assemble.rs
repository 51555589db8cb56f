use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::constants;
use crate::models::report::{ReportDocument, ReportEntity, ReportLine, ReportSection};
use crate::models::tracking::TrackingRecord;
use crate::utils::{format_date, format_timestamp};

/// Turns records and entities into report documents.
///
/// Assembly never reads the clock: `generated_at` comes from the caller, so
/// identical inputs give identical documents.
#[derive(Debug, Clone, Copy)]
pub struct ReportAssembler {
    tz: Tz,
}

impl ReportAssembler {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Single-record report: one section per timeline event
    pub fn tracking(&self, record: &TrackingRecord, generated_at: DateTime<Utc>) -> ReportDocument {
        let summary = vec![
            ReportLine::new("Generated on", format_date(&generated_at, self.tz)),
            ReportLine::new("Product", &record.product_name),
            ReportLine::new("ID", &record.product_id),
            ReportLine::new("Status", record.current_status().label()),
            ReportLine::new("Location", record.current_location()),
        ];

        let sections = record
            .events()
            .iter()
            .enumerate()
            .map(|(index, event)| ReportSection {
                heading: format!("{}. {}", index + 1, event.event_type),
                lines: vec![
                    ReportLine::new("Status", event.status.label()),
                    ReportLine::new("Location", &event.location),
                    ReportLine::new(
                        "Date",
                        event
                            .timestamp
                            .map(|at| format_timestamp(&at, self.tz))
                            .unwrap_or_else(|| constants::PENDING_LABEL.to_string()),
                    ),
                ],
            })
            .collect();

        ReportDocument {
            title: constants::TRACKING_REPORT_TITLE.to_string(),
            generated_at,
            summary,
            sections,
        }
    }

    /// Bulk report: one section per entity, only the fields it has
    pub fn bulk(
        &self,
        title: &str,
        entities: &[ReportEntity],
        generated_at: DateTime<Utc>,
    ) -> ReportDocument {
        let mut summary = vec![ReportLine::new(
            "Generated on",
            format_date(&generated_at, self.tz),
        )];
        if entities.is_empty() {
            summary.push(ReportLine::new("", constants::NO_DATA_LABEL));
        }

        let sections = entities
            .iter()
            .enumerate()
            .map(|(index, entity)| {
                let mut lines = Vec::new();
                if let Some(description) = &entity.description {
                    lines.push(ReportLine::new("Description", description));
                }
                if let Some(status) = &entity.status {
                    lines.push(ReportLine::new("Status", status));
                }
                if let Some(location) = &entity.location {
                    lines.push(ReportLine::new("Location", location));
                }
                if let Some(created_at) = &entity.created_at {
                    lines.push(ReportLine::new("Created", format_date(created_at, self.tz)));
                }
                ReportSection {
                    heading: format!("{}. {}", index + 1, entity.name.as_deref().unwrap_or("Item")),
                    lines,
                }
            })
            .collect();

        ReportDocument {
            title: title.to_string(),
            generated_at,
            summary,
            sections,
        }
    }
}
