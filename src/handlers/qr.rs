use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use super::download;
use super::errors::{handle_qr_error, handle_tracking_error, ApiError};
use crate::services::qr::{self, QrError, QrOptions, QrPayload};
use crate::types::ApiResponse;
use crate::utils::filenames;
use crate::AppState;

pub fn create_qr_routes() -> Router<AppState> {
    Router::new()
        .route("/qr", post(generate_qr))
        .route("/qr/products/{product_id}", get(product_qr))
        .route("/qr/products/{product_id}/payload", get(product_qr_payload))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QrFormat {
    Png,
    Svg,
}

impl QrFormat {
    fn parse(value: Option<&str>) -> Result<Self, QrError> {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("png") => Ok(QrFormat::Png),
            Some("svg") => Ok(QrFormat::Svg),
            Some(other) => Err(QrError::InvalidInput(format!(
                "Unsupported QR format '{other}', expected png or svg"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct QrParams {
    pub format: Option<String>,
    pub level: Option<String>,
    pub size: Option<u32>,
}

/// Free-form QR request from the generator screen
#[derive(Debug, Deserialize)]
pub struct QrRequest {
    pub data: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(flatten)]
    pub params: QrParams,
}

fn render(symbol: &qr::QrImage, format: QrFormat, png_name: &str, svg_name: &str) -> Result<Response, ApiError> {
    match format {
        QrFormat::Png => {
            let png = symbol.to_png().or_else(handle_qr_error)?;
            Ok(download("image/png", png_name, png))
        }
        QrFormat::Svg => Ok(download(
            "image/svg+xml",
            svg_name,
            symbol.to_svg().into_bytes(),
        )),
    }
}

/// QR code that opens the product's tracking page
/// GET /api/qr/products/{product_id}?format=png|svg&level=M&size=256
async fn product_qr(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Query(params): Query<QrParams>,
) -> Result<Response, ApiError> {
    let format = QrFormat::parse(params.format.as_deref()).or_else(handle_qr_error)?;
    let options = QrOptions::new(params.level.as_deref(), params.size).or_else(handle_qr_error)?;
    let record = state.tracking.get(&product_id).await.or_else(handle_tracking_error)?;

    let payload = qr::build(&record.product_id, &state.config.public_origin).or_else(handle_qr_error)?;
    let symbol = qr::encode(&payload.url, &options).or_else(handle_qr_error)?;
    tracing::debug!(product_id = %record.product_id, modules = symbol.modules(), "🔳 Product QR rendered");

    render(
        &symbol,
        format,
        &filenames::product_qr_png(&record.product_id),
        &filenames::qr_svg(&record.product_name),
    )
}

/// GET /api/qr/products/{product_id}/payload
async fn product_qr_payload(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<ApiResponse<QrPayload>>, ApiError> {
    let record = state.tracking.get(&product_id).await.or_else(handle_tracking_error)?;
    let payload = qr::build(&record.product_id, &state.config.public_origin).or_else(handle_qr_error)?;
    Ok(Json(ApiResponse::success(payload, "QR payload")))
}

/// POST /api/qr
async fn generate_qr(Json(request): Json<QrRequest>) -> Result<Response, ApiError> {
    let format = QrFormat::parse(request.params.format.as_deref()).or_else(handle_qr_error)?;
    let options = QrOptions::new(request.params.level.as_deref(), request.params.size)
        .or_else(handle_qr_error)?;
    let symbol = qr::encode(&request.data, &options).or_else(handle_qr_error)?;

    let title = request.title.as_deref().unwrap_or("QR_Code");
    render(
        &symbol,
        format,
        &filenames::qr_png(filenames::unix_millis()),
        &filenames::qr_svg(title),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{app, get_json, send};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};

    #[test]
    fn format_parsing() {
        assert_eq!(QrFormat::parse(None).unwrap(), QrFormat::Png);
        assert_eq!(QrFormat::parse(Some("SVG")).unwrap(), QrFormat::Svg);
        assert!(QrFormat::parse(Some("gif")).is_err());
    }

    #[tokio::test]
    async fn product_qr_downloads_as_png() {
        let app = app().await;
        let request = Request::get("/api/qr/products/PRD123456").body(Body::empty()).unwrap();
        let (status, body, headers) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "image/png");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"qr-PRD123456.png\""
        );
        assert_eq!(&body[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn product_qr_as_svg_is_named_after_the_product() {
        let app = app().await;
        let request = Request::get("/api/qr/products/PRD123456?format=svg&level=H")
            .body(Body::empty())
            .unwrap();
        let (status, body, headers) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Organic_Coffee_Beans_QR.svg\""
        );
        assert!(String::from_utf8(body).unwrap().contains("<svg"));
    }

    #[tokio::test]
    async fn payload_points_at_landing_page() {
        let app = app().await;
        let (status, body) = get_json(&app, "/api/qr/products/PRD123456/payload").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["url"], "https://trace.example.com/track-product?id=PRD123456");
    }

    #[tokio::test]
    async fn free_text_qr_and_bad_size() {
        let app = app().await;
        let request = Request::post("/api/qr")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"data":"https://example.com/batch/7","size":512}"#))
            .unwrap();
        let (status, _, headers) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"QR_Code_"));

        let request = Request::post("/api/qr")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"data":"hello","size":10}"#))
            .unwrap();
        let (status, _, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn payload_too_long_for_a_symbol_is_400() {
        let app = app().await;
        let body = serde_json::json!({ "data": "x".repeat(8000) }).to_string();
        let request = Request::post("/api/qr")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let (status, body, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(body["message"].as_str().unwrap().contains("too long"));
    }

    #[tokio::test]
    async fn unknown_product_has_no_qr() {
        let app = app().await;
        let (status, _) = get_json(&app, "/api/qr/products/NOPE").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
