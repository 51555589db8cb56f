pub mod dashboard;
pub mod errors;
pub mod landing;
pub mod products;
pub mod qr;
pub mod reports;
pub mod tracking;
pub mod users;

use axum::{
    extract::{ConnectInfo, Request},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::constants::CLIENT_ID_HEADER;
use crate::utils::filenames;
use crate::AppState;

/// JSON routes served under `/api`
pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .merge(tracking::create_tracking_routes())
        .merge(products::create_product_routes())
        .merge(users::create_user_routes())
        .merge(dashboard::create_dashboard_routes())
}

/// Download routes (QR images and PDF reports); rate limited by the caller
pub fn create_export_routes() -> Router<AppState> {
    Router::new()
        .merge(qr::create_qr_routes())
        .merge(reports::create_report_routes())
}

/// Address of the connected peer, when the server was started with connect info
pub fn peer_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Key that groups searches from one client: the `x-client-id` header, else the peer address
pub fn client_key(request: &Request) -> String {
    let header_id = request
        .headers()
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match header_id {
        Some(id) => format!("client:{id}"),
        None => format!("addr:{}", peer_ip(request)),
    }
}

/// Binary attachment response
pub fn download(content_type: &str, file_name: &str, bytes: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, filenames::attachment(file_name)),
        ],
        bytes,
    )
        .into_response()
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::database::{seed, Database, MemoryStore};
    use crate::AppState;

    /// Router over the demo data set with no simulated latency
    pub async fn app() -> Router {
        let store = Arc::new(MemoryStore::default());
        seed::load(store.as_ref()).await.unwrap();
        let database = Database::with_repositories(store.clone(), store);
        let config = AppConfig {
            public_origin: "https://trace.example.com".to_string(),
            ..AppConfig::default()
        };
        crate::build_router(AppState::new(database, config))
    }

    pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>, axum::http::HeaderMap) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec(), headers)
    }

    pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, body, _) = send(app, Request::get(uri).body(Body::empty()).unwrap()).await;
        (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
    }

    pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let request = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, body, _) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
    }
}
