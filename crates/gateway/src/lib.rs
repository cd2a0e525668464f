//! HTTP API gateway for Selah.
//!
//! Exposes the health check and the v1 chat API (buffered JSON and SSE).
//! Built on Axum; every request is normalized before it reaches the engine.

pub mod api_v1;
pub mod request;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, response::Json, routing::get};
use selah_config::AppConfig;
use selah_engine::{ChatEngine, EngineSettings};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub engine: ChatEngine,
    pub history_limit: usize,
    pub max_body_bytes: usize,
    pub allowed_origins: Vec<String>,
}

impl GatewayState {
    pub fn new(engine: ChatEngine, config: &AppConfig) -> Self {
        Self {
            engine,
            history_limit: config.conversation.history_limit,
            max_body_bytes: config.gateway.max_body_bytes,
            allowed_origins: config.gateway.allowed_origins.clone(),
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the full router.
///
/// Layers applied:
/// - Request body size limit (`[gateway].max_body_bytes`)
/// - CORS for the configured client origins
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.allowed_origins);
    let body_limit = state.max_body_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Any origin when the list is empty; otherwise exactly the listed ones.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Wire the engine from configuration: provider, store, index, tool catalog.
pub async fn build_engine(config: &AppConfig) -> Result<ChatEngine, Box<dyn std::error::Error>> {
    let router = selah_providers::build_from_config(config);
    let provider = router
        .default_provider()
        .ok_or("No default provider configured")?;
    let backends = selah_store::open(&config.store).await?;
    let registry = Arc::new(selah_tools::catalog_registry(backends.store.clone()));

    info!(
        provider = %provider.name(),
        store = %backends.store.name(),
        tools = registry.len(),
        "Engine ready"
    );
    Ok(ChatEngine::new(
        provider,
        backends.store,
        backends.index,
        registry,
        EngineSettings::from_config(config),
    ))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let engine = build_engine(&config).await?;
    let app = build_router(Arc::new(GatewayState::new(engine, &config)));

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use test_support::{ScriptedProvider, state_with};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(state_with(ScriptedProvider::replying("ok")));

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let store = Arc::new(selah_store::InMemoryStore::new());
        let registry = Arc::new(selah_tools::catalog_registry(store.clone()));
        let engine = ChatEngine::new(
            Arc::new(ScriptedProvider::replying("ok")),
            store.clone(),
            store,
            registry,
            EngineSettings::default(),
        );
        let mut config = AppConfig::default();
        config.gateway.max_body_bytes = 64;
        let app = build_router(Arc::new(GatewayState::new(engine, &config)));

        let body = serde_json::json!({ "message": "x".repeat(500) }).to_string();
        let req = Request::builder()
            .method("POST")
            .uri("/v1/chat")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn invalid_origins_are_skipped() {
        let _ = cors_layer(&["https://app.selah.example".into(), "\u{0}bad".into()]);
    }
}
