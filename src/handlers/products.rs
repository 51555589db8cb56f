use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use super::errors::{handle_tracking_error, ApiError};
use crate::models::dashboard::EventLogEntry;
use crate::models::tracking::{EventType, NewProduct, NewSupplyEvent, TrackingRecord};
use crate::services::timeline::{self, AnnotatedEvent};
use crate::services::tracking_service::ProductQuery;
use crate::types::ApiResponse;
use crate::AppState;

pub fn create_product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(register_product))
        .route("/products/{product_id}", get(get_product))
        .route("/products/{product_id}/timeline", get(get_timeline))
        .route("/products/{product_id}/events", post(log_event))
        .route("/events", get(list_events))
}

#[derive(Debug, Deserialize)]
pub struct EventLogParams {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

/// GET /api/products?query=&status=&location=&sort=
async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductQuery>,
) -> Result<Json<ApiResponse<Vec<TrackingRecord>>>, ApiError> {
    let records = state.tracking.list(&filter).await.or_else(handle_tracking_error)?;
    let message = format!("{} product(s)", records.len());
    Ok(Json(ApiResponse::success(records, &message)))
}

/// POST /api/products
async fn register_product(
    State(state): State<AppState>,
    Json(request): Json<NewProduct>,
) -> Result<(StatusCode, Json<ApiResponse<TrackingRecord>>), ApiError> {
    let record = state.tracking.register(request).await.or_else(handle_tracking_error)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(record, "Product registered successfully")),
    ))
}

/// GET /api/products/{product_id}
async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<ApiResponse<TrackingRecord>>, ApiError> {
    let record = state.tracking.get(&product_id).await.or_else(handle_tracking_error)?;
    Ok(Json(ApiResponse::success(record, "Product found")))
}

/// GET /api/products/{product_id}/timeline
async fn get_timeline(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<AnnotatedEvent>>>, ApiError> {
    let record = state.tracking.get(&product_id).await.or_else(handle_tracking_error)?;
    Ok(Json(ApiResponse::success(timeline::render(&record), "Timeline")))
}

/// POST /api/products/{product_id}/events
async fn log_event(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Json(request): Json<NewSupplyEvent>,
) -> Result<(StatusCode, Json<ApiResponse<TrackingRecord>>), ApiError> {
    let record = state
        .tracking
        .log_event(&product_id, request)
        .await
        .or_else(handle_tracking_error)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(record, "Event logged successfully")),
    ))
}

/// GET /api/events?type=
async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<EventLogParams>,
) -> Result<Json<ApiResponse<Vec<EventLogEntry>>>, ApiError> {
    let event_type = match params.event_type.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() && !t.eq_ignore_ascii_case("all") => {
            Some(t.parse::<EventType>().or_else(handle_tracking_error)?)
        }
        _ => None,
    };
    let events = state
        .tracking
        .event_log(event_type)
        .await
        .or_else(handle_tracking_error)?;
    let message = format!("{} event(s)", events.len());
    Ok(Json(ApiResponse::success(events, &message)))
}

#[cfg(test)]
mod tests {
    use crate::handlers::test_support::{app, get_json, post_json};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn register_then_log_events() {
        let app = app().await;
        let (status, body) = post_json(
            &app,
            "/api/products",
            json!({
                "id": "TEA-001",
                "name": "Green Tea",
                "manufacturer": "Tea Estates",
                "location": "Darjeeling",
                "batchNumber": "B-7"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["currentStatus"], "registered");
        assert_eq!(body["data"]["batchNumber"], "B-7");

        let (status, body) = post_json(
            &app,
            "/api/products/TEA-001/events",
            json!({ "type": "shipment", "location": "Kolkata Port", "actor": "Carrier" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["currentStatus"], "in_transit");
        assert_eq!(body["data"]["currentLocation"], "Kolkata Port");

        let (_, body) = get_json(&app, "/api/products/tea-001/timeline").await;
        let timeline = body["data"].as_array().unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[1]["current"], true);
    }

    #[tokio::test]
    async fn delivered_product_rejects_events() {
        let app = app().await;
        let (status, body) = post_json(
            &app,
            "/api/products/PRD345678/events",
            json!({ "type": "alert", "location": "Chicago", "actor": "Auditor" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation error");
    }

    #[tokio::test]
    async fn missing_fields_are_validation_errors() {
        let app = app().await;
        let (status, _) = post_json(
            &app,
            "/api/products",
            json!({ "name": "  ", "manufacturer": "X", "location": "Y" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let app = app().await;
        let (status, body) = get_json(&app, "/api/products?status=delivered").await;
        assert_eq!(status, StatusCode::OK);
        let products = body["data"].as_array().unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0]["productId"], "PRD345678");
    }

    #[tokio::test]
    async fn list_by_location_and_description() {
        let app = app().await;
        let (_, body) = get_json(&app, "/api/products?location=chicago").await;
        let products = body["data"].as_array().unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0]["productId"], "PRD345678");

        let (_, body) = get_json(&app, "/api/products?query=dark%20chocolate").await;
        assert_eq!(body["data"][0]["productId"], "PR-2024-001");
    }

    #[tokio::test]
    async fn event_log_filters_by_type() {
        let app = app().await;
        let (status, body) = get_json(&app, "/api/events?type=customs").await;
        assert_eq!(status, StatusCode::OK);
        let events = body["data"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["productId"], "PRD123456");

        let (status, _) = get_json(&app, "/api/events?type=teleported").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_product_is_404() {
        let app = app().await;
        let (status, _) = get_json(&app, "/api/products/NOPE").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
