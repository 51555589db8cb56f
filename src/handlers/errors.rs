use axum::{http::StatusCode, response::Json};
use serde_json::json;

use crate::models::report::ExportError;
use crate::models::tracking::TrackingError;
use crate::services::qr::QrError;

pub type ApiError = (StatusCode, Json<serde_json::Value>);

pub fn handle_tracking_error<T>(error: TrackingError) -> Result<T, ApiError> {
    match error {
        TrackingError::NotFound { query } => Err((
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Product not found",
                "message": format!("No product matches '{}'. Check the ID and try again.", query),
                "query": query
            })),
        )),
        TrackingError::Validation(msg) => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Validation error",
                "message": msg
            })),
        )),
        TrackingError::Superseded => Err((
            StatusCode::CONFLICT,
            Json(json!({
                "error": "Superseded",
                "message": "A newer search replaced this one"
            })),
        )),
        TrackingError::Conflict(msg) => Err((
            StatusCode::CONFLICT,
            Json(json!({
                "error": "Conflict",
                "message": msg
            })),
        )),
        TrackingError::TransientNetwork(msg) => {
            tracing::warn!("Transient tracking failure: {msg}");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "Service unavailable",
                    "message": "The tracking service is temporarily unavailable, please retry"
                })),
            ))
        }
    }
}

pub fn handle_qr_error<T>(error: QrError) -> Result<T, ApiError> {
    match error {
        QrError::InvalidInput(msg) => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Invalid input",
                "message": msg
            })),
        )),
        QrError::Encode(msg) => {
            tracing::error!("QR encoding error: {msg}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "QR generation failed",
                    "message": "Failed to generate QR code"
                })),
            ))
        }
    }
}

pub fn handle_export_error<T>(error: ExportError) -> Result<T, ApiError> {
    match error {
        ExportError::InvalidInput(msg) => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Invalid input",
                "message": msg
            })),
        )),
        ExportError::NotFound(id) => Err((
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Product not found",
                "message": format!("Product '{}' not found", id)
            })),
        )),
        ExportError::Render(msg) => {
            tracing::error!("Report rendering error: {msg}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Export failed",
                    "message": "Failed to generate the report"
                })),
            ))
        }
    }
}
