use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
};
use chrono_tz::Tz;
use serde::Deserialize;
use std::fmt::Write;

use crate::models::tracking::{TrackingError, TrackingRecord};
use crate::services::timeline::{self, AnnotatedEvent};
use crate::utils::html::escape;
use crate::utils::{format_timestamp, now_in};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LandingParams {
    pub id: Option<String>,
}

/// Page a scanned QR code opens
/// GET /track-product?id={productId}
pub async fn track_product_page(
    State(state): State<AppState>,
    Query(params): Query<LandingParams>,
) -> (StatusCode, Html<String>) {
    let tz = state.config.report_timezone;
    let product_id = params.id.unwrap_or_default();
    if product_id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Html(notice_page("Invalid request", "A product ID is required.")),
        );
    }

    match state.tracking.get(&product_id).await {
        Ok(record) => (StatusCode::OK, Html(record_page(&record, tz))),
        Err(TrackingError::NotFound { .. }) => (
            StatusCode::NOT_FOUND,
            Html(notice_page(
                "Product not found",
                &format!("No product with ID '{}' is registered.", product_id.trim()),
            )),
        ),
        Err(TrackingError::TransientNetwork(msg)) => {
            tracing::warn!("Landing page lookup failed: {msg}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Html(notice_page(
                    "Temporarily unavailable",
                    "Tracking data could not be loaded. Please try again shortly.",
                )),
            )
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Html(notice_page("Invalid request", &e.to_string())),
        ),
    }
}

fn shell(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape(title),
        body
    )
}

fn notice_page(heading: &str, message: &str) -> String {
    shell(
        heading,
        &format!(
            "<main class=\"empty-state\">\n<h1>{}</h1>\n<p>{}</p>\n</main>\n",
            escape(heading),
            escape(message)
        ),
    )
}

fn record_page(record: &TrackingRecord, tz: Tz) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        "<main>\n<h1>{}</h1>\n<p class=\"product-id\">{}</p>\n<p>{}</p>\n\
         <dl>\n<dt>Manufacturer</dt><dd>{}</dd>\n<dt>Status</dt><dd class=\"status\">{}</dd>\n\
         <dt>Location</dt><dd>{}</dd>\n</dl>\n<ol class=\"timeline\">\n",
        escape(&record.product_name),
        escape(&record.product_id),
        escape(&record.description),
        escape(&record.manufacturer),
        record.current_status().label(),
        escape(record.current_location()),
    );
    for event in timeline::render(record) {
        body.push_str(&timeline_item(&event, tz));
    }
    let _ = write!(
        body,
        "</ol>\n<footer>Viewed {}</footer>\n</main>\n",
        now_in(tz).format("%Y-%m-%d %H:%M %Z")
    );
    shell(&format!("{} | Tracking", record.product_name), &body)
}

fn timeline_item(event: &AnnotatedEvent, tz: Tz) -> String {
    let mut classes = vec![if event.completed { "completed" } else { "pending" }];
    if event.current {
        classes.push("current");
    }
    if event.connector {
        classes.push("connector");
    }
    let when = event
        .timestamp
        .map(|at| format_timestamp(&at, tz))
        .unwrap_or_else(|| crate::constants::PENDING_LABEL.to_string());

    format!(
        "<li class=\"{}\">\n<h2>{}</h2>\n<p>{}</p>\n<p>{} &middot; {}</p>\n<time>{}</time>\n</li>\n",
        classes.join(" "),
        event.event_type,
        escape(&event.description),
        escape(&event.location),
        escape(&event.actor),
        when
    )
}
