use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Stage of a product in the supply chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Registered,
    InTransit,
    AtDistributor,
    AtRetailer,
    Delivered,
}

impl ProductStatus {
    pub const ALL: [ProductStatus; 5] = [
        ProductStatus::Registered,
        ProductStatus::InTransit,
        ProductStatus::AtDistributor,
        ProductStatus::AtRetailer,
        ProductStatus::Delivered,
    ];

    /// Human readable label used in reports and the landing page
    pub fn label(self) -> &'static str {
        match self {
            ProductStatus::Registered => "Registered",
            ProductStatus::InTransit => "In Transit",
            ProductStatus::AtDistributor => "At Distributor",
            ProductStatus::AtRetailer => "At Retailer",
            ProductStatus::Delivered => "Delivered",
        }
    }

    /// Delivered products accept no further events
    pub fn is_terminal(self) -> bool {
        self == ProductStatus::Delivered
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProductStatus {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "registered" | "created" => Ok(ProductStatus::Registered),
            "intransit" => Ok(ProductStatus::InTransit),
            "atdistributor" => Ok(ProductStatus::AtDistributor),
            "atretailer" => Ok(ProductStatus::AtRetailer),
            "delivered" => Ok(ProductStatus::Delivered),
            _ => Err(TrackingError::Validation(format!("Unknown product status '{s}'"))),
        }
    }
}

/// Kind of action a stakeholder logged against a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    #[serde(alias = "produced", alias = "manufactured", alias = "registration")]
    Registered,
    QualityCheck,
    #[serde(alias = "shipment")]
    Shipped,
    #[serde(alias = "arrival")]
    Received,
    Customs,
    Storage,
    #[serde(alias = "delivery")]
    Delivered,
    Alert,
}

impl EventType {
    pub fn label(self) -> &'static str {
        match self {
            EventType::Registered => "Registered",
            EventType::QualityCheck => "Quality Check",
            EventType::Shipped => "Shipped",
            EventType::Received => "Received",
            EventType::Customs => "Customs",
            EventType::Storage => "Storage",
            EventType::Delivered => "Delivered",
            EventType::Alert => "Alert",
        }
    }

    /// Status the product moves into when an event of this type is appended
    /// after `history`. Informational events keep the current status.
    pub fn resulting_status(self, current: ProductStatus, history: &[SupplyEvent]) -> ProductStatus {
        match self {
            EventType::Registered => ProductStatus::Registered,
            EventType::Shipped | EventType::Customs => ProductStatus::InTransit,
            EventType::Received => {
                let reached_distributor = history
                    .iter()
                    .any(|e| e.status == ProductStatus::AtDistributor);
                if reached_distributor {
                    ProductStatus::AtRetailer
                } else {
                    ProductStatus::AtDistributor
                }
            }
            EventType::Delivered => ProductStatus::Delivered,
            EventType::QualityCheck | EventType::Storage | EventType::Alert => current,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EventType {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "registered" | "registration" | "produced" | "manufactured" => Ok(EventType::Registered),
            "qualitycheck" => Ok(EventType::QualityCheck),
            "shipped" | "shipment" => Ok(EventType::Shipped),
            "received" | "arrival" => Ok(EventType::Received),
            "customs" => Ok(EventType::Customs),
            "storage" => Ok(EventType::Storage),
            "delivered" | "delivery" => Ok(EventType::Delivered),
            "alert" => Ok(EventType::Alert),
            _ => Err(TrackingError::Validation(format!("Unknown event type '{s}'"))),
        }
    }
}

fn normalize_token(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// One immutable milestone in a product's journey
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub status: ProductStatus,
    pub location: String,
    /// `None` while the milestone has not happened yet
    pub timestamp: Option<DateTime<Utc>>,
    pub description: String,
    pub actor: String,
}

impl SupplyEvent {
    pub fn is_completed(&self) -> bool {
        self.timestamp.is_some()
    }
}

/// Input for appending an event to a record
#[derive(Debug, Clone)]
pub struct EventEntry {
    pub event_type: EventType,
    pub location: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub description: String,
    pub actor: String,
    pub status: Option<ProductStatus>,
}

/// Identity of a registered product
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDetails {
    pub product_id: String,
    pub product_name: String,
    pub description: String,
    pub manufacturer: String,
    pub category: Option<String>,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

/// Full state of one product's journey.
///
/// `current_status` and `current_location` mirror the last completed event
/// and are recomputed whenever the event log grows; they cannot be set
/// directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRecord {
    pub product_id: String,
    pub product_name: String,
    pub description: String,
    pub manufacturer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    current_status: ProductStatus,
    current_location: String,
    events: Vec<SupplyEvent>,
}

impl TrackingRecord {
    /// Register a product; the first event is always the registration
    pub fn register(details: ProductDetails, location: &str, at: DateTime<Utc>) -> Self {
        let actor = details.manufacturer.clone();
        let mut record = Self::empty(details, at);
        record.push(EventEntry {
            event_type: EventType::Registered,
            location: location.to_string(),
            timestamp: Some(at),
            description: "Product registered in supply chain".to_string(),
            actor,
            status: None,
        });
        record
    }

    /// Rebuild a record from a complete event history (seed data, imports)
    pub fn from_history(
        details: ProductDetails,
        created_at: DateTime<Utc>,
        history: Vec<EventEntry>,
    ) -> Result<Self, TrackingError> {
        let mut record = Self::empty(details, created_at);
        for entry in history {
            record.append(entry)?;
        }
        Ok(record)
    }

    fn empty(details: ProductDetails, created_at: DateTime<Utc>) -> Self {
        Self {
            product_id: details.product_id,
            product_name: details.product_name,
            description: details.description,
            manufacturer: details.manufacturer,
            category: details.category,
            batch_number: details.batch_number,
            expiry_date: details.expiry_date,
            created_at,
            current_status: ProductStatus::Registered,
            current_location: String::new(),
            events: Vec::new(),
        }
    }

    pub fn current_status(&self) -> ProductStatus {
        self.current_status
    }

    pub fn current_location(&self) -> &str {
        &self.current_location
    }

    pub fn events(&self) -> &[SupplyEvent] {
        &self.events
    }

    /// Append an event to the log. Delivered records are closed.
    pub fn append(&mut self, entry: EventEntry) -> Result<&SupplyEvent, TrackingError> {
        if self.current_status.is_terminal() && !self.events.is_empty() {
            return Err(TrackingError::Validation(format!(
                "Product '{}' has already been delivered",
                self.product_id
            )));
        }
        Ok(self.push(entry))
    }

    fn push(&mut self, entry: EventEntry) -> &SupplyEvent {
        let status = entry.status.unwrap_or_else(|| {
            entry
                .event_type
                .resulting_status(self.current_status, &self.events)
        });
        let event = SupplyEvent {
            id: format!("EVT{:04}", self.events.len() + 1),
            event_type: entry.event_type,
            status,
            location: entry.location,
            timestamp: entry.timestamp,
            description: entry.description,
            actor: entry.actor,
        };
        self.events.push(event);
        self.refresh_current();
        &self.events[self.events.len() - 1]
    }

    fn refresh_current(&mut self) {
        if let Some(last) = self.events.iter().rev().find(|e| e.is_completed()) {
            self.current_status = last.status;
            self.current_location = last.location.clone();
        }
    }

    /// Latest completed event, if any
    pub fn latest_completed(&self) -> Option<&SupplyEvent> {
        self.events.iter().rev().find(|e| e.is_completed())
    }

    /// Case-insensitive match against product id or name
    pub fn matches(&self, needle_lower: &str) -> bool {
        self.product_id.to_lowercase().contains(needle_lower)
            || self.product_name.to_lowercase().contains(needle_lower)
    }

    /// Listing search: id, name or description
    pub fn matches_text(&self, needle_lower: &str) -> bool {
        self.matches(needle_lower) || self.description.to_lowercase().contains(needle_lower)
    }
}

/// Product registration request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub manufacturer: String,
    pub location: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub batch_number: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), TrackingError> {
        require("name", &self.name)?;
        require("manufacturer", &self.manufacturer)?;
        require("location", &self.location)?;
        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                return Err(TrackingError::Validation(
                    "Product ID must not be blank when provided".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Supply event logging request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSupplyEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub location: String,
    #[serde(default)]
    pub description: String,
    pub actor: String,
    /// Defaults to the time the event is logged
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Planned milestones carry no timestamp until they happen
    #[serde(default)]
    pub planned: bool,
    #[serde(default)]
    pub status: Option<ProductStatus>,
}

impl NewSupplyEvent {
    pub fn validate(&self) -> Result<(), TrackingError> {
        require("location", &self.location)?;
        require("actor", &self.actor)
    }

    pub fn into_entry(self, now: DateTime<Utc>) -> EventEntry {
        let timestamp = if self.planned {
            None
        } else {
            Some(self.timestamp.unwrap_or(now))
        };
        EventEntry {
            event_type: self.event_type,
            location: self.location.trim().to_string(),
            timestamp,
            description: self.description.trim().to_string(),
            actor: self.actor.trim().to_string(),
            status: self.status,
        }
    }
}

pub(crate) fn require(field: &str, value: &str) -> Result<(), TrackingError> {
    if value.trim().is_empty() {
        Err(TrackingError::Validation(format!("Field '{field}' is required")))
    } else {
        Ok(())
    }
}

/// Tracking operation errors
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Product '{query}' not found")]
    NotFound { query: String },

    #[error("Search was superseded by a newer request")]
    Superseded,

    #[error("Tracking service temporarily unavailable: {0}")]
    TransientNetwork(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn details(id: &str) -> ProductDetails {
        ProductDetails {
            product_id: id.to_string(),
            product_name: "Organic Coffee Beans".to_string(),
            description: "Premium organic coffee beans from Colombia".to_string(),
            manufacturer: "Colombian Coffee Co.".to_string(),
            category: None,
            batch_number: None,
            expiry_date: None,
        }
    }

    fn entry(event_type: EventType, location: &str, hour: Option<u32>) -> EventEntry {
        EventEntry {
            event_type,
            location: location.to_string(),
            timestamp: hour.map(|h| Utc.with_ymd_and_hms(2024, 1, 15, h, 0, 0).unwrap()),
            description: String::new(),
            actor: "Tester".to_string(),
            status: None,
        }
    }

    #[test]
    fn registration_creates_first_event() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        let record = TrackingRecord::register(details("PR-2024-001"), "Bogotá, Colombia", at);

        assert_eq!(record.events().len(), 1);
        assert_eq!(record.events()[0].id, "EVT0001");
        assert_eq!(record.events()[0].event_type, EventType::Registered);
        assert_eq!(record.current_status(), ProductStatus::Registered);
        assert_eq!(record.current_location(), "Bogotá, Colombia");
    }

    #[test]
    fn current_fields_follow_last_completed_event() {
        let record = TrackingRecord::from_history(
            details("PR-2024-001"),
            Utc::now(),
            vec![
                entry(EventType::Registered, "Factory", Some(8)),
                entry(EventType::Shipped, "Port of Cartagena", Some(10)),
                entry(EventType::Delivered, "Customer", None),
            ],
        )
        .unwrap();

        let last_completed = record.latest_completed().unwrap();
        assert_eq!(record.current_status(), last_completed.status);
        assert_eq!(record.current_location(), last_completed.location);
        assert_eq!(record.current_status(), ProductStatus::InTransit);
        assert_eq!(record.current_location(), "Port of Cartagena");
    }

    #[test]
    fn received_moves_through_distributor_then_retailer() {
        let record = TrackingRecord::from_history(
            details("PRD123456"),
            Utc::now(),
            vec![
                entry(EventType::Registered, "Factory", Some(1)),
                entry(EventType::Shipped, "Port", Some(2)),
                entry(EventType::Received, "Miami Distribution Center", Some(3)),
                entry(EventType::QualityCheck, "Miami Distribution Center", Some(4)),
                entry(EventType::Shipped, "Highway 95", Some(5)),
                entry(EventType::Received, "Retail Store", Some(6)),
            ],
        )
        .unwrap();

        let statuses: Vec<_> = record.events().iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                ProductStatus::Registered,
                ProductStatus::InTransit,
                ProductStatus::AtDistributor,
                ProductStatus::AtDistributor,
                ProductStatus::InTransit,
                ProductStatus::AtRetailer,
            ]
        );
        assert_eq!(record.current_status(), ProductStatus::AtRetailer);
    }

    #[test]
    fn delivered_record_rejects_new_events() {
        let mut record = TrackingRecord::from_history(
            details("PRD000001"),
            Utc::now(),
            vec![
                entry(EventType::Registered, "Factory", Some(1)),
                entry(EventType::Delivered, "Customer", Some(2)),
            ],
        )
        .unwrap();

        let err = record.append(entry(EventType::Alert, "Customer", Some(3))).unwrap_err();
        assert!(matches!(err, TrackingError::Validation(_)));
        assert_eq!(record.events().len(), 2);
    }

    #[test]
    fn explicit_status_overrides_derivation() {
        let mut record = TrackingRecord::register(details("PRD000002"), "Factory", Utc::now());
        let mut e = entry(EventType::Storage, "Retail Backroom", Some(9));
        e.status = Some(ProductStatus::AtRetailer);
        record.append(e).unwrap();
        assert_eq!(record.current_status(), ProductStatus::AtRetailer);
    }

    #[test]
    fn parses_labels_and_aliases() {
        assert_eq!("In Transit".parse::<ProductStatus>().unwrap(), ProductStatus::InTransit);
        assert_eq!("at_retailer".parse::<ProductStatus>().unwrap(), ProductStatus::AtRetailer);
        assert_eq!("Quality Check".parse::<EventType>().unwrap(), EventType::QualityCheck);
        assert_eq!("shipment".parse::<EventType>().unwrap(), EventType::Shipped);
        assert!("teleported".parse::<EventType>().is_err());
    }

    #[test]
    fn planned_event_has_no_timestamp() {
        let request = NewSupplyEvent {
            event_type: EventType::Delivered,
            location: "Customer".to_string(),
            description: "Out for Delivery".to_string(),
            actor: "Courier".to_string(),
            timestamp: None,
            planned: true,
            status: None,
        };
        let entry = request.into_entry(Utc::now());
        assert!(entry.timestamp.is_none());
    }
}
