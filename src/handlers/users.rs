use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};

use super::errors::{handle_tracking_error, ApiError};
use crate::models::user::{NewUser, User, UserFilter};
use crate::types::ApiResponse;
use crate::AppState;

pub fn create_user_routes() -> Router<AppState> {
    Router::new().route("/users", get(list_users).post(register_user))
}

/// GET /api/users?query=&role=&status=
async fn list_users(
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    let users = state.users.list(&filter).await.or_else(handle_tracking_error)?;
    let message = format!("{} user(s)", users.len());
    Ok(Json(ApiResponse::success(users, &message)))
}

/// POST /api/users
async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<NewUser>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), ApiError> {
    let user = state.users.register(request).await.or_else(handle_tracking_error)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(user, "User registered successfully")),
    ))
}
