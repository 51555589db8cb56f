use axum::{
    extract::{Query, Request, State},
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

use super::client_key;
use super::errors::{handle_qr_error, handle_tracking_error, ApiError};
use crate::models::tracking::TrackingRecord;
use crate::services::qr;
use crate::services::timeline::{self, AnnotatedEvent};
use crate::types::ApiResponse;
use crate::AppState;

pub fn create_tracking_routes() -> Router<AppState> {
    Router::new()
        .route("/track", get(track))
        .route("/track/session", get(track_session))
}

#[derive(Debug, Deserialize)]
pub struct TrackParams {
    #[serde(default, alias = "id")]
    pub query: String,
}

/// Record plus everything the tracking screen draws from it
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResult {
    pub product: TrackingRecord,
    pub timeline: Vec<AnnotatedEvent>,
    pub qr_url: String,
}

/// Sequenced product lookup; a newer search from the same client wins
/// GET /api/track?query={productId}
async fn track(
    State(state): State<AppState>,
    Query(params): Query<TrackParams>,
    request: Request,
) -> Result<Json<ApiResponse<TrackResult>>, ApiError> {
    let client = client_key(&request);
    let record = state
        .tracking
        .find(&client, &params.query)
        .await
        .or_else(handle_tracking_error)?;

    let payload = qr::build(&record.product_id, &state.config.public_origin).or_else(handle_qr_error)?;
    let result = TrackResult {
        timeline: timeline::render(&record),
        qr_url: payload.url,
        product: record,
    };
    Ok(Json(ApiResponse::success(result, "Product found")))
}

/// What the calling client's tracking screen currently shows
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub ticket: u64,
    pub product: Option<TrackingRecord>,
    pub notice: Option<String>,
}

/// GET /api/track/session
async fn track_session(State(state): State<AppState>, request: Request) -> Json<ApiResponse<SessionView>> {
    let client = client_key(&request);
    let view = state.tracking.coordinator().view(&client).await.unwrap_or_default();
    let session = SessionView {
        ticket: view.ticket(),
        product: view.record().cloned(),
        notice: view.notice().map(str::to_string),
    };
    Json(ApiResponse::success(session, "Tracking session"))
}
