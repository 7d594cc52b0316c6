//! HTTP surface of the relay
//!
//! Three routes plus a JSON 404 fallback, fronted by a CORS layer scoped to
//! the configured browser origin. Handlers are thin: they delegate to the
//! shared `Forwarder` and translate `ForwardError` into the status and JSON
//! body the client expects.

use crate::config::{RelayConfig, SERVER_TIMEOUT, UPSTREAM_TIMEOUT};
use crate::forward::{CompletionRequest, ForwardError, Forwarder};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// JSON body returned for every failed completion call
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<String>,
    response_time_ms: u64,
}

/// Build the application router around a shared forwarder
pub fn build_router(forwarder: Arc<Forwarder>) -> Router {
    let cors = cors_layer(forwarder.config());

    Router::new()
        .route("/api/llama", post(completion_handler))
        .route("/health", get(health_handler))
        .route("/api/test", get(test_handler))
        .fallback(not_found_handler)
        .layer(middleware::from_fn(log_request))
        .layer(cors)
        .with_state(forwarder)
}

/// Bind and serve until the process is stopped
pub async fn serve(config: RelayConfig) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let forwarder = Arc::new(Forwarder::new(Arc::clone(&config))?);
    let router = build_router(forwarder);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("starting relay on {}", addr);
    info!("health check: http://localhost:{}/health", config.port);
    info!("main API:     http://localhost:{}/api/llama", config.port);
    info!("test:         http://localhost:{}/api/test", config.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}

fn cors_layer(config: &RelayConfig) -> CorsLayer {
    let origin = config
        .frontend_origin
        .parse::<HeaderValue>()
        .unwrap_or_else(|_| {
            warn!(
                origin = %config.frontend_origin,
                "FRONTEND_URL is not a valid origin, falling back to https://localhost:3000"
            );
            HeaderValue::from_static("https://localhost:3000")
        });

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
        .allow_credentials(true)
}

async fn log_request(request: Request, next: Next) -> Response {
    info!(method = %request.method(), path = %request.uri().path(), "request");
    next.run(request).await
}

async fn completion_handler(
    State(forwarder): State<Arc<Forwarder>>,
    payload: Result<Json<CompletionRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(%rejection, "rejecting unparseable request body");
            return error_response(ForwardError::InvalidRequest, started);
        }
    };

    match forwarder.handle_completion(request).await {
        Ok(upstream) => {
            info!(
                status = upstream.status,
                response_time_ms = started.elapsed().as_millis() as u64,
                "completion request succeeded"
            );
            let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::OK);
            (status, Json(upstream.body)).into_response()
        }
        Err(error) => error_response(error, started),
    }
}

async fn health_handler(State(forwarder): State<Arc<Forwarder>>) -> Response {
    let config = forwarder.config();
    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    Json(json!({
        "status": "OK",
        "timestamp": timestamp_ms,
        "port": config.port,
        "timeouts": {
            "api_timeout_ms": UPSTREAM_TIMEOUT.as_millis() as u64,
            "server_timeout_ms": SERVER_TIMEOUT.as_millis() as u64,
        },
        "env": {
            "has_api_endpoint": config.endpoint.is_some(),
            "has_api_key": config.api_key.is_some(),
            "has_deploy_name": config.deploy_name.is_some(),
            "api_endpoint": config.endpoint_preview(),
            "deploy_name": config.deploy_name.as_deref().unwrap_or("NOT_SET"),
        },
    }))
    .into_response()
}

async fn test_handler(State(forwarder): State<Arc<Forwarder>>) -> Response {
    let config = forwarder.config();
    let connectivity = forwarder.probe().await;

    Json(json!({
        "timestamp": SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0),
        "timeouts": {
            "api_timeout_ms": UPSTREAM_TIMEOUT.as_millis() as u64,
            "server_timeout_ms": SERVER_TIMEOUT.as_millis() as u64,
        },
        "environment": {
            "has_endpoint": config.endpoint.is_some(),
            "has_key": config.api_key.is_some(),
            "has_deploy_name": config.deploy_name.is_some(),
            "endpoint": config.endpoint_preview(),
            "deploy_name": config.deploy_name.as_deref().unwrap_or("NOT_SET"),
            "key_preview": config
                .api_key
                .as_ref()
                .map(|k| k.preview())
                .unwrap_or_else(|| "NOT_SET".to_string()),
        },
        "connectivity": connectivity,
    }))
    .into_response()
}

async fn not_found_handler(method: Method, uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Route not found",
            "method": method.as_str(),
            "path": uri.path(),
            "available_routes": ["/health", "/api/llama", "/api/test"],
        })),
    )
        .into_response()
}

fn error_response(error: ForwardError, started: Instant) -> Response {
    let status = error.status();
    let response_time_ms = started.elapsed().as_millis() as u64;

    warn!(
        status = status.as_u16(),
        response_time_ms,
        %error,
        "completion request failed"
    );

    let details = match &error {
        ForwardError::UpstreamRejected { details, .. } if !details.is_empty() => {
            Some(details.clone())
        }
        _ => None,
    };

    let body = ErrorBody {
        error: error.to_string(),
        details,
        suggestion: error.suggestion().map(str::to_string),
        response_time_ms,
    };

    (status, Json(body)).into_response()
}
