use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    response::Response,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use super::download;
use super::errors::{handle_export_error, handle_tracking_error, ApiError};
use crate::models::report::{ExportError, ReportEntity, ReportType};
use crate::models::tracking::TrackingError;
use crate::models::user::UserFilter;
use crate::services::report::ExportArtifact;
use crate::services::tracking_service::{ProductQuery, ProductSort};
use crate::AppState;

/// Upper bound for an uploaded view capture
const MAX_CAPTURE_BYTES: usize = 16 * 1024 * 1024;

pub fn create_report_routes() -> Router<AppState> {
    Router::new()
        .route("/reports/tracking/{product_id}", get(tracking_report))
        .route(
            "/reports/view",
            post(view_report).layer(DefaultBodyLimit::max(MAX_CAPTURE_BYTES)),
        )
        .route("/reports/{report_type}", get(bulk_report))
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewParams {
    pub name: Option<String>,
}

/// PDF rendering is CPU bound; run it off the async workers and finish it
/// even if the client goes away
async fn render_blocking<F>(job: F) -> Result<ExportArtifact, ExportError>
where
    F: FnOnce() -> Result<ExportArtifact, ExportError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| ExportError::Render(format!("export task failed: {e}")))?
}

fn into_download(artifact: ExportArtifact) -> Response {
    info!(
        file_name = %artifact.file_name,
        bytes = artifact.bytes.len(),
        "📥 Report ready"
    );
    download(artifact.content_type, &artifact.file_name, artifact.bytes)
}

/// GET /api/reports/tracking/{product_id}
async fn tracking_report(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Response, ApiError> {
    let record = match state.tracking.get(&product_id).await {
        Ok(record) => record,
        Err(TrackingError::NotFound { query }) => {
            return handle_export_error(ExportError::NotFound(query))
        }
        Err(e) => return handle_tracking_error(e),
    };
    let exporter = state.exporter.clone();
    let generated_at = Utc::now();

    let artifact = render_blocking(move || exporter.tracking_report(&record, generated_at))
        .await
        .or_else(handle_export_error)?;
    Ok(into_download(artifact))
}

/// GET /api/reports/{report_type}
async fn bulk_report(
    State(state): State<AppState>,
    Path(report_type): Path<String>,
) -> Result<Response, ApiError> {
    let report_type: ReportType = report_type.parse().or_else(handle_export_error)?;

    let entities: Vec<ReportEntity> = match report_type {
        ReportType::Products => {
            let filter = ProductQuery {
                sort: ProductSort::Oldest,
                ..Default::default()
            };
            let records = state.tracking.list(&filter).await.or_else(handle_tracking_error)?;
            records.iter().map(ReportEntity::from).collect()
        }
        ReportType::Users => {
            let users = state
                .users
                .list(&UserFilter::default())
                .await
                .or_else(handle_tracking_error)?;
            users.iter().map(ReportEntity::from).collect()
        }
    };

    let exporter = state.exporter.clone();
    let generated_at = Utc::now();
    let artifact = render_blocking(move || exporter.bulk_report(report_type, &entities, generated_at))
        .await
        .or_else(handle_export_error)?;
    Ok(into_download(artifact))
}

/// Bitmap mode: the client posts a PNG/JPEG capture of the rendered view
/// POST /api/reports/view?name=
async fn view_report(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
    body: Bytes,
) -> Result<Response, ApiError> {
    if body.is_empty() {
        return handle_export_error(ExportError::InvalidInput(
            "Request body must contain the captured view".to_string(),
        ));
    }
    let stem = params
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "view".to_string());

    let exporter = state.exporter.clone();
    let generated_at = Utc::now();
    let artifact = render_blocking(move || exporter.view_report(&body, &stem, generated_at))
        .await
        .or_else(handle_export_error)?;
    Ok(into_download(artifact))
}
