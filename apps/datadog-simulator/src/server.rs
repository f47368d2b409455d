//! HTTP Server implementation

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::cli::Args;
use crate::generator::{simulate, ParsedQuery, QueryResponse};

const API_KEY_HEADER: &str = "DD-API-KEY";
const APPLICATION_KEY_HEADER: &str = "DD-APPLICATION-KEY";

/// Longest range the simulator will fill with points
const MAX_RANGE_SECONDS: i64 = 31 * 24 * 60 * 60;

/// Credentials the simulator accepts
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub application_key: String,
}

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    credentials: Arc<Credentials>,
}

impl AppState {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials: Arc::new(credentials),
        }
    }
}

/// Error body in the shape Datadog uses: `{"errors": [...]}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "errors": [self.message] }))).into_response()
    }
}

pub struct Server {
    args: Args,
    state: AppState,
}

impl Server {
    pub fn new(args: Args, state: AppState) -> Result<Self> {
        Ok(Self { args, state })
    }

    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.args.host, self.args.port)
            .parse()
            .context("Invalid bind address")?;

        let app = build_router(self.state);

        info!("Datadog simulator listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .context("Failed to bind HTTP server")?;

        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server error")?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/validate", get(validate))
        .route("/api/v1/query", get(query_metrics))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn check_auth(headers: &HeaderMap, credentials: &Credentials) -> Result<(), ApiError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    };

    let (Some(api_key), Some(application_key)) =
        (header(API_KEY_HEADER), header(APPLICATION_KEY_HEADER))
    else {
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "API key and application key are required",
        ));
    };

    if api_key != credentials.api_key {
        return Err(ApiError::new(StatusCode::FORBIDDEN, "Invalid API key"));
    }
    if application_key != credentials.application_key {
        return Err(ApiError::new(StatusCode::FORBIDDEN, "Invalid application key"));
    }
    Ok(())
}

// Route handlers

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn validate(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_auth(&headers, &state.credentials)?;
    Ok(Json(json!({ "valid": true })))
}

/// Raw query string; numbers are parsed leniently so a bad value reads as missing
#[derive(Debug, Deserialize)]
struct QueryParams {
    from: Option<String>,
    to: Option<String>,
    query: Option<String>,
}

fn nonzero_seconds(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v != 0)
}

async fn query_metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<QueryParams>,
) -> Result<Json<QueryResponse>, ApiError> {
    check_auth(&headers, &state.credentials)?;

    let from = nonzero_seconds(params.from.as_deref());
    let to = nonzero_seconds(params.to.as_deref());
    let expression = params.query.unwrap_or_default();

    let (Some(from), Some(to)) = (from, to) else {
        return Err(missing_parameters());
    };
    if expression.is_empty() {
        return Err(missing_parameters());
    }

    check_range(from, to)?;

    let parsed = ParsedQuery::parse(&expression)
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "Invalid query format"))?;

    debug!(query = %expression, from, to, "Simulating query");
    let response = simulate(&mut rand::thread_rng(), &expression, &parsed, from, to);

    Ok(Json(response))
}

/// Both bounds must be representable in milliseconds and span at most `MAX_RANGE_SECONDS`
fn check_range(from: i64, to: i64) -> Result<(), ApiError> {
    if from.checked_mul(1000).is_none() || to.checked_mul(1000).is_none() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "from and to must be epoch seconds",
        ));
    }
    if to < from {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "from must not be after to",
        ));
    }
    if to - from > MAX_RANGE_SECONDS {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("Time range exceeds {} seconds", MAX_RANGE_SECONDS),
        ));
    }
    Ok(())
}

fn missing_parameters() -> ApiError {
    ApiError::new(
        StatusCode::BAD_REQUEST,
        "Missing required parameters: from, to, query",
    )
}

async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Endpoint not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn router() -> Router {
        build_router(AppState::new(Credentials {
            api_key: "key".to_string(),
            application_key: "app".to_string(),
        }))
    }

    fn authed(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(API_KEY_HEADER, "key")
            .header(APPLICATION_KEY_HEADER, "app")
            .body(Body::empty())
            .unwrap()
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health().await;
        assert_eq!(response.0["status"], "healthy");
    }

    #[tokio::test]
    async fn test_validate_ok() {
        let (status, body) = send(authed("/api/v1/validate")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
    }

    #[tokio::test]
    async fn test_validate_rejects_bad_credentials() {
        let request = Request::builder()
            .uri("/api/v1/validate")
            .header(API_KEY_HEADER, "key")
            .header(APPLICATION_KEY_HEADER, "wrong")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["errors"][0], "Invalid application key");

        let request = Request::builder()
            .uri("/api/v1/validate")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_query_returns_series() {
        let (status, body) = send(authed(
            "/api/v1/query?from=1764658800&to=1764662400&query=avg%3Aprocessor.time%7Bhost%3Aa%7D%20by%20%7Bhost%2Cinstance%7D",
        ))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["series"].as_array().unwrap().len(), 4);
        assert_eq!(body["series"][1]["scope"], "host:a,instance:1");
        assert_eq!(body["series"][0]["pointlist"].as_array().unwrap().len(), 181);
        assert_eq!(body["from_date"], 1_764_658_800_000_i64);
    }

    #[tokio::test]
    async fn test_query_missing_parameters() {
        let (status, body) = send(authed("/api/v1/query?from=1764658800&query=avg%3Acpu%7B%2A%7D")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0], "Missing required parameters: from, to, query");

        let (status, _) = send(authed("/api/v1/query?from=abc&to=1&query=avg%3Acpu%7B%2A%7D")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_query_invalid_format() {
        let (status, body) = send(authed("/api/v1/query?from=1&to=2&query=avg%3Acpu")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0], "Invalid query format");
    }

    #[tokio::test]
    async fn test_query_rejects_overflowing_timestamps() {
        let (status, body) = send(authed(
            "/api/v1/query?from=9223372036854775807&to=9223372036854775807&query=avg%3Acpu%7B%2A%7D",
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0], "from and to must be epoch seconds");
    }

    #[tokio::test]
    async fn test_query_rejects_inverted_and_oversized_ranges() {
        let (status, body) = send(authed("/api/v1/query?from=2000&to=1000&query=avg%3Acpu%7B%2A%7D")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0], "from must not be after to");

        let (status, body) = send(authed(
            "/api/v1/query?from=1&to=9000000000&query=avg%3Acpu%7B%2A%7D",
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"][0]
            .as_str()
            .unwrap()
            .starts_with("Time range exceeds"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, body) = send(authed("/api/v2/query")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errors"][0], "Endpoint not found");
    }
}
