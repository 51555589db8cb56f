use serde::Serialize;

use crate::models::tracking::{EventType, ProductStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: ProductStatus,
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentProduct {
    pub product_id: String,
    pub product_name: String,
    pub status: ProductStatus,
    pub current_location: String,
}

/// Event flattened with the product it belongs to, for activity feeds
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLogEntry {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub location: String,
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
    pub description: String,
    pub actor: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_products: usize,
    pub total_users: usize,
    pub total_events: usize,
    pub active_products: usize,
    pub by_status: Vec<StatusCount>,
    pub recent_products: Vec<RecentProduct>,
    pub recent_events: Vec<EventLogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopularQuery {
    pub query: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAnalytics {
    pub total_searches: u64,
    pub popular_queries: Vec<PopularQuery>,
}
