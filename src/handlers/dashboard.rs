use axum::{extract::State, response::Json, routing::get, Router};

use super::errors::{handle_tracking_error, ApiError};
use crate::models::dashboard::{DashboardStats, SearchAnalytics};
use crate::types::ApiResponse;
use crate::AppState;

pub fn create_dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(get_dashboard))
        .route("/analytics/search", get(get_search_analytics))
}

/// GET /api/dashboard
async fn get_dashboard(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    let stats = state.tracking.dashboard().await.or_else(handle_tracking_error)?;
    Ok(Json(ApiResponse::success(stats, "Dashboard statistics")))
}

/// GET /api/analytics/search
async fn get_search_analytics(State(state): State<AppState>) -> Json<ApiResponse<SearchAnalytics>> {
    Json(ApiResponse::success(
        state.tracking.search_analytics().await,
        "Search analytics",
    ))
}

#[cfg(test)]
mod tests {
    use crate::handlers::test_support::{app, get_json};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn dashboard_counts_seed_data() {
        let app = app().await;
        let (status, body) = get_json(&app, "/api/dashboard").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["totalProducts"], 4);
        assert_eq!(body["data"]["totalUsers"], 3);
        assert_eq!(body["data"]["activeProducts"], 3);
        assert_eq!(body["data"]["byStatus"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn analytics_count_track_queries() {
        let app = app().await;
        get_json(&app, "/api/track?query=PRD123456").await;
        get_json(&app, "/api/track?query=prd123456").await;

        let (_, body) = get_json(&app, "/api/analytics/search").await;
        assert_eq!(body["data"]["totalSearches"], 2);
        assert_eq!(body["data"]["popularQueries"][0]["query"], "prd123456");
        assert_eq!(body["data"]["popularQueries"][0]["count"], 2);
    }
}
