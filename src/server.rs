//! HTTP surface: routing, CORS, security headers, rate limiting and the
//! mapping from pipeline errors to status codes.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{ConnectInfo, DefaultBodyLimit, Request, State, rejection::JsonRejection},
    http::{HeaderValue, Method, StatusCode, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::Instrument;
use uuid::Uuid;

use crate::TarotService;
use crate::config::Config;
use crate::error::{Result, TarotError};
use crate::models::{HealthResponse, RawReadingRequest, ReadingResponse};
use crate::rate_limit::RateLimiter;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error while generating tarot reading";
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";
pub const CORS_REJECTED_MESSAGE: &str = "Not allowed by CORS";

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TarotService>,
    pub config: Arc<Config>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: Arc<Config>, service: Arc<TarotService>) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limiter.max_requests,
            config.rate_limit_window(),
        ));
        Self {
            service,
            config,
            rate_limiter,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Error responses returned to HTTP clients
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden,
    NotFound(String),
    TooManyRequests,
    Internal,
}

impl From<TarotError> for ApiError {
    fn from(err: TarotError) -> Self {
        match err {
            TarotError::Validation(message) => ApiError::BadRequest(message),
            _ => ApiError::Internal,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, CORS_REJECTED_MESSAGE.to_string()),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::TooManyRequests => {
                (StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT_MESSAGE.to_string())
            }
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_MESSAGE.to_string(),
            ),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/reading", post(reading));

    Router::new()
        .route("/", get(root))
        .nest("/api/tarot", api)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.config.server.body_limit_bytes))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(middleware::from_fn_with_state(state.clone(), cors))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: AppState) -> Result<()> {
    let bind = state.config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    let local = listener.local_addr()?;

    tracing::info!(%local, "SeerAI Tarot Backend listening");
    tracing::info!("Health check: http://{local}/api/tarot/health");
    tracing::info!("Tarot reading: http://{local}/api/tarot/reading");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "message": format!("Welcome to {}", state.config.server.name),
        "version": state.config.server.version,
        "endpoints": {
            "health": "GET /api/tarot/health",
            "reading": "POST /api/tarot/reading"
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: format!("{} is running", state.config.server.name),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

async fn reading(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RawReadingRequest>, JsonRejection>,
) -> std::result::Result<Json<ReadingResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("reading", %request_id);

    async move {
        let result = run_reading(&state, payload).await;
        match &result {
            Err(e) if e.is_client_error() => tracing::warn!(kind = e.kind(), "Rejected reading request: {}", e),
            Err(e) => tracing::error!(kind = e.kind(), "Error generating tarot reading: {}", e),
            Ok(_) => tracing::info!("Reading generated"),
        }
        result.map(Json).map_err(ApiError::from)
    }
    .instrument(span)
    .await
}

async fn run_reading(
    state: &AppState,
    payload: std::result::Result<Json<RawReadingRequest>, JsonRejection>,
) -> Result<ReadingResponse> {
    let Json(raw) = payload.map_err(|rejection| {
        TarotError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    // Dropping the pipeline future on expiry abandons the provider call.
    let deadline = state.config.request_timeout();
    tokio::time::timeout(deadline, state.service.generate_reading(raw))
        .await
        .map_err(|_| TarotError::Timeout(deadline.as_secs()))?
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Route {} {} not found", method, uri.path()))
}

async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    if !state.rate_limiter.check(client) {
        return ApiError::TooManyRequests.into_response();
    }
    next.run(req).await
}

async fn cors(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(origin) = req.headers().get(header::ORIGIN) else {
        return next.run(req).await;
    };
    // An Origin that is not visible ASCII cannot match the allow-list.
    let Ok(origin) = origin.to_str().map(str::to_string) else {
        tracing::warn!("Rejected cross-origin request with unreadable Origin header");
        return ApiError::Forbidden.into_response();
    };

    let allowed = state
        .config
        .server
        .allowed_origins
        .iter()
        .any(|o| *o == origin);
    let Ok(origin_value) = HeaderValue::from_str(&origin) else {
        return ApiError::Forbidden.into_response();
    };
    if !allowed {
        tracing::warn!(%origin, "Rejected cross-origin request");
        return ApiError::Forbidden.into_response();
    }

    let preflight = req.method() == Method::OPTIONS;
    let mut response = if preflight {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin_value);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    if preflight {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        );
    }
    response
}

async fn security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
    headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.insert(
        header::X_DNS_PREFETCH_CONTROL,
        HeaderValue::from_static("off"),
    );
    headers.insert(
        "cross-origin-opener-policy",
        HeaderValue::from_static("same-origin"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = ApiError::from(TarotError::Validation("Exactly 3 cards".to_string()));
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Exactly 3 cards"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_other_errors_map_to_internal() {
        for err in [
            TarotError::Gateway("401 invalid_api_key sk-abc".to_string()),
            TarotError::Timeout(60),
            TarotError::Config("x".to_string()),
        ] {
            let api = ApiError::from(err);
            assert!(matches!(api, ApiError::Internal));
            assert_eq!(
                api.into_response().status(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }
    }
}
