use anyhow::{bail, Context, Result};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod constants;
mod database;
mod handlers;
mod models;
mod services;
mod types;
mod utils;

use config::AppConfig;
use database::Database;
use services::{ReportExporter, TrackingService, UserService};
use types::ApiResponse;

#[derive(Clone)]
pub struct AppState {
    pub tracking: TrackingService,
    pub users: UserService,
    pub exporter: ReportExporter,
    pub config: Arc<AppConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("tracking", &self.tracking)
            .field("public_origin", &self.config.public_origin)
            .finish()
    }
}

impl AppState {
    pub fn new(database: Database, config: AppConfig) -> Self {
        Self {
            tracking: TrackingService::new(database.clone()),
            users: UserService::new(database),
            exporter: ReportExporter::new(config.report_timezone),
            config: Arc::new(config),
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub status: String,
    pub message: String,
    pub backend: String,
    pub timestamp: String,
    pub version: String,
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        status: "healthy".to_string(),
        message: "Supply trace backend is running".to_string(),
        backend: state.tracking.database().get_backend_name().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: VERSION.to_string(),
    })
}

/// Per-address limit on QR and PDF downloads
async fn rate_limit_middleware(
    State(limiter): State<Arc<DefaultKeyedRateLimiter<IpAddr>>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = handlers::peer_ip(&request);
    match limiter.check_key(&ip) {
        Ok(()) => next.run(request).await,
        Err(_) => {
            warn!("🚫 Export rate limit exceeded for IP: {}", ip);
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ApiResponse::<()>::error("Too many export requests, please wait a minute")),
            )
                .into_response()
        }
    }
}

/// Assemble every route with logging, security headers and export limits
pub fn build_router(state: AppState) -> Router {
    let per_minute = NonZeroU32::new(state.config.export_rate_limit_per_minute).unwrap_or(NonZeroU32::MIN);
    let export_limiter: Arc<DefaultKeyedRateLimiter<IpAddr>> =
        Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute)));

    let api = handlers::create_api_routes().merge(
        handlers::create_export_routes()
            .route_layer(from_fn_with_state(export_limiter, rate_limit_middleware)),
    );

    Router::new()
        .route("/api/health", get(health_check))
        .nest("/api", api)
        .route("/track-product", get(handlers::landing::track_product_page))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::HeaderName::from_static("x-xss-protection"),
            HeaderValue::from_static("1; mode=block"),
        ))
        .with_state(state)
}

fn build_cors(cors_origins: &str, production: bool) -> Result<CorsLayer> {
    let client_id = header::HeaderName::from_static(constants::CLIENT_ID_HEADER);
    let methods = [Method::GET, Method::POST];

    if cors_origins.trim() == "*" {
        if production {
            bail!("🔒 CORS wildcard (*) is not allowed in production. Set CORS_ORIGINS to specific origins.");
        }
        warn!("⚠️ CORS is configured with wildcard (*) - this is only acceptable for development!");
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, client_id]));
    }

    let origins: Vec<HeaderValue> = cors_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();
    if origins.is_empty() {
        warn!("⚠️ No valid CORS origins found in CORS_ORIGINS, falling back to localhost only");
        return Ok(CorsLayer::new()
            .allow_origin(HeaderValue::from_static(constants::DEFAULT_PUBLIC_ORIGIN))
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, client_id]));
    }

    info!("🔒 CORS configured for specific origins: {}", cors_origins);
    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE, client_id])
        .expose_headers([header::CONTENT_DISPOSITION]))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            EnvFilter::new("supply_trace_backend=info,tower_http=warn")
        } else {
            EnvFilter::new("supply_trace_backend=warn,tower_http=error")
        }
    });

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();
    init_tracing();

    info!("🚀 Starting Supply Trace Backend v{}", VERSION);

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    info!("Server configured to run on {}:{}", config.host, config.port);
    info!("CORS origins: {}", config.cors_origins);
    info!("QR codes point at {}", config.public_origin);

    let production = std::env::var("RUST_ENV").unwrap_or_default() == "production";
    let cors = build_cors(&config.cors_origins, production)?;

    let database = Database::new(&config)
        .await
        .context("Failed to initialize tracking store")?;

    let address = format!("{}:{}", config.host, config.port);
    let app = build_router(AppState::new(database, config)).layer(cors);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {address}"))?;

    info!("🎯 Supply Trace Server started successfully on http://{}", address);
    info!("🔧 API endpoints available at http://{}/api/", address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server failed")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{seed, MemoryStore, SimulatedNetwork};
    use std::time::Duration;

    async fn spawn_server(config: AppConfig, latency_ms: u64) -> String {
        let store = Arc::new(MemoryStore::default());
        seed::load(store.as_ref()).await.unwrap();
        let network = Arc::new(SimulatedNetwork::new(store, Duration::from_millis(latency_ms), 0.0));
        let database = Database::with_repositories(network.clone(), network);

        let app = build_router(AppState::new(database, config));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .unwrap();
        });
        format!("http://{address}")
    }

    #[tokio::test]
    async fn health_reports_version() {
        let base = spawn_server(AppConfig::default(), 0).await;
        let body: serde_json::Value = reqwest::get(format!("{base}/api/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], VERSION);
    }

    #[tokio::test]
    async fn retyped_search_cancels_the_earlier_one() {
        let base = spawn_server(AppConfig::default(), 300).await;
        let client = reqwest::Client::new();

        let first = {
            let request = client
                .get(format!("{base}/api/track?query=PRD123456"))
                .header(constants::CLIENT_ID_HEADER, "scanner-1");
            tokio::spawn(async move { request.send().await.unwrap().status() })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = client
            .get(format!("{base}/api/track?query=PRD789012"))
            .header(constants::CLIENT_ID_HEADER, "scanner-1")
            .send()
            .await
            .unwrap();

        assert_eq!(second.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = second.json().await.unwrap();
        assert_eq!(body["data"]["product"]["productId"], "PRD789012");
        assert_eq!(first.await.unwrap(), reqwest::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn exports_are_rate_limited_per_address() {
        let config = AppConfig {
            export_rate_limit_per_minute: 2,
            ..AppConfig::default()
        };
        let base = spawn_server(config, 0).await;
        let url = format!("{base}/api/qr/products/PRD123456");

        for _ in 0..2 {
            assert_eq!(reqwest::get(&url).await.unwrap().status(), reqwest::StatusCode::OK);
        }
        assert_eq!(
            reqwest::get(&url).await.unwrap().status(),
            reqwest::StatusCode::TOO_MANY_REQUESTS
        );
        // JSON routes are not limited
        let dashboard = reqwest::get(format!("{base}/api/dashboard")).await.unwrap();
        assert_eq!(dashboard.status(), reqwest::StatusCode::OK);
    }

    #[test]
    fn wildcard_cors_is_refused_in_production() {
        assert!(build_cors("*", true).is_err());
        assert!(build_cors("*", false).is_ok());
        assert!(build_cors("https://trace.example.com, https://admin.example.com", true).is_ok());
    }
}
