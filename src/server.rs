//! HTTP surface: landing page, number allocation endpoint, health and metrics.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::client::NumberProvider;
use crate::error::ProviderError;
use crate::types::{AllocatedNumber, NumberRequest};

const LANDING_PAGE: &str = include_str!("../templates/index.html");

/// Message returned alongside every allocated number
pub const CONFIRMATION: &str = "New number requested";

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    provider: Arc<dyn NumberProvider>,
    api_key: Option<Arc<str>>,
    metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(provider: Arc<dyn NumberProvider>) -> Self {
        Self {
            provider,
            api_key: None,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Require `Authorization: Bearer <key>` on allocation requests
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(Arc::from(api_key.into()));
        self
    }
}

/// Server metrics
struct Metrics {
    total_requests: AtomicU64,
    requests_in_flight: AtomicU64,
    numbers_allocated: AtomicU64,
    failed_requests: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            requests_in_flight: AtomicU64::new(0),
            numbers_allocated: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

/// RAII guard for tracking in-flight requests
struct RequestGuard<'a>(&'a AtomicU64);

impl<'a> RequestGuard<'a> {
    fn enter(counter: &'a AtomicU64) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Build the Axum application with routes and middleware
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/request_number", post(request_number))
        .route("/health", get(health_check))
        .route("/api/metrics", get(get_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Landing page
async fn index() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider_configured: state.provider.is_configured(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    provider_configured: bool,
}

/// Allocate one new phone number
async fn request_number(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<NumberResponse>, ApiError> {
    state.metrics.total_requests.fetch_add(1, Ordering::Relaxed);
    let _guard = RequestGuard::enter(&state.metrics.requests_in_flight);

    match allocate(&state, &headers, &body).await {
        Ok(number) => {
            state
                .metrics
                .numbers_allocated
                .fetch_add(1, Ordering::Relaxed);
            Ok(Json(NumberResponse {
                success: true,
                message: CONFIRMATION,
                data: number,
            }))
        }
        Err(e) => {
            state.metrics.failed_requests.fetch_add(1, Ordering::Relaxed);
            Err(e)
        }
    }
}

async fn allocate(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<AllocatedNumber, ApiError> {
    authorize(state.api_key.as_deref(), headers)?;
    let request = parse_number_request(body)?;

    tracing::info!(
        area_code = request.area_code.as_deref().unwrap_or("-"),
        "Number requested"
    );

    state
        .provider
        .acquire_number(&request)
        .await
        .map_err(|e| {
            tracing::error!("Number request failed: {}", e);
            ApiError::Provider(e)
        })
}

/// Check the bearer key when one is configured
fn authorize(api_key: Option<&str>, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = api_key else {
        return Ok(());
    };

    // Auth scheme names are case-insensitive
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Bearer"))
        .map(|(_, key)| key.trim());

    match presented {
        Some(key) if key == expected => Ok(()),
        _ => {
            tracing::warn!("Rejected number request with missing or invalid API key");
            Err(ApiError::Unauthorized)
        }
    }
}

/// Empty bodies (including bare form posts from the landing page) mean "any number"
fn parse_number_request(body: &[u8]) -> Result<NumberRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(NumberRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))
}

#[derive(Serialize)]
struct NumberResponse {
    success: bool,
    message: &'static str,
    data: AllocatedNumber,
}

/// Get server metrics
async fn get_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    let metrics = &state.metrics;
    Json(MetricsResponse {
        total_requests: metrics.total_requests.load(Ordering::Relaxed),
        requests_in_flight: metrics.requests_in_flight.load(Ordering::Relaxed),
        numbers_allocated: metrics.numbers_allocated.load(Ordering::Relaxed),
        failed_requests: metrics.failed_requests.load(Ordering::Relaxed),
        uptime_seconds: metrics.start_time.elapsed().as_secs(),
    })
}

#[derive(Serialize)]
struct MetricsResponse {
    total_requests: u64,
    requests_in_flight: u64,
    numbers_allocated: u64,
    failed_requests: u64,
    uptime_seconds: u64,
}

/// API error types
#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Unauthorized,
    Provider(ProviderError),
}

/// HTTP status reported for an adapter failure
pub fn provider_status(err: &ProviderError) -> StatusCode {
    match err {
        ProviderError::Auth { .. } => StatusCode::FORBIDDEN,
        ProviderError::Unavailable { .. } => StatusCode::BAD_GATEWAY,
        e @ ProviderError::Rejected { .. } if e.is_throttled() => StatusCode::TOO_MANY_REQUESTS,
        ProviderError::Rejected { .. } => StatusCode::CONFLICT,
        ProviderError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Missing or invalid API key".to_string(),
            ),
            ApiError::Provider(e) => (provider_status(&e), e.to_string()),
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": message
        }));

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_status_mapping() {
        assert_eq!(
            provider_status(&ProviderError::auth("bad token")),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            provider_status(&ProviderError::unavailable("timeout")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            provider_status(&ProviderError::Rejected {
                status: Some(429),
                code: None,
                message: "slow down".to_string(),
            }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            provider_status(&ProviderError::Rejected {
                status: Some(400),
                code: Some(21452),
                message: "none left".to_string(),
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            provider_status(&ProviderError::InvalidRequest("area_code".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_parse_number_request() {
        assert!(parse_number_request(b"").unwrap().area_code.is_none());
        assert!(parse_number_request(b" \n").unwrap().area_code.is_none());

        let request = parse_number_request(br#"{"area_code": "415"}"#).unwrap();
        assert_eq!(request.area_code.as_deref(), Some("415"));

        assert!(matches!(
            parse_number_request(b"area_code=415"),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_authorize() {
        let mut headers = HeaderMap::new();
        assert!(authorize(None, &headers).is_ok());
        assert!(matches!(
            authorize(Some("k3y"), &headers),
            Err(ApiError::Unauthorized)
        ));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer nope"));
        assert!(authorize(Some("k3y"), &headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer k3y"));
        assert!(authorize(Some("k3y"), &headers).is_ok());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer k3y"));
        assert!(authorize(Some("k3y"), &headers).is_ok());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic k3y"));
        assert!(authorize(Some("k3y"), &headers).is_err());
    }
}
