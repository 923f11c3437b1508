//! HTTP surface: `GET /api/screenshot` and `GET /health`

use crate::capture::ScreenshotBackend;
use crate::config::CaptureSettings;
use crate::request::{FieldError, RawScreenshotQuery, ScreenshotRequest};
use crate::{ErrorSeverity, ScreenshotError};
use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn ScreenshotBackend>,
    pub capture: Arc<CaptureSettings>,
}

impl AppState {
    pub fn new(backend: Arc<dyn ScreenshotBackend>, capture: CaptureSettings) -> Self {
        Self {
            backend,
            capture: Arc::new(capture),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/screenshot", get(screenshot))
        .route("/health", get(health))
        .layer(middleware::from_fn(log_responses))
        .with_state(state)
}

/// Access log line per request, with the query string left out since it carries the target URL.
async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let start = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();

    if path == "/health" {
        debug!(status = status.as_u16(), elapsed_ms, "health check");
    } else {
        info!(
            status = status.as_u16(),
            method = %method,
            path = %path,
            elapsed_ms,
            "request completed"
        );
    }
    response
}

async fn screenshot(
    State(state): State<AppState>,
    query: Result<Query<RawScreenshotQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(raw) = query.map_err(|rejection| {
        ApiError::from(ScreenshotError::InvalidInput(
            FieldError::new("query", rejection.body_text()).into(),
        ))
    })?;

    let request = ScreenshotRequest::validate(&raw).map_err(ScreenshotError::from)?;
    let options = request.resolve(&state.capture);

    let data = state.backend.capture(&request.url, &options).await?;
    metrics::counter!("screenshot_requests_total", "outcome" => "ok").increment(1);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, options.format.mime_type().to_string()),
            (header::CONTENT_DISPOSITION, options.format.content_disposition()),
        ],
        data,
    )
        .into_response())
}

/// Orchestrators poll this continuously, so a failure here neither counts as a
/// screenshot outcome nor raises the browser alarm.
async fn health(State(state): State<AppState>) -> Response {
    if state.backend.is_available() {
        return StatusCode::NO_CONTENT.into_response();
    }

    let unavailable = ScreenshotError::BrowserUnavailable;
    let body = ApiErrorMessage {
        code: unavailable.code(),
        message: unavailable.to_string(),
        field: None,
        violations: Vec::new(),
    };
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiErrorBody { error: body }),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<FieldError>,
}

/// Error response wrapper mapping [`ScreenshotError`] to a status and JSON body
#[derive(Debug)]
pub struct ApiError(ScreenshotError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ScreenshotError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ScreenshotError::NavigationTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ScreenshotError::NavigationFailed(_) => StatusCode::BAD_GATEWAY,
            ScreenshotError::BrowserUnavailable | ScreenshotError::BrowserLaunchFailed(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ScreenshotError::CaptureFailure(_)
            | ScreenshotError::ConfigurationError(_)
            | ScreenshotError::Chrome(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ScreenshotError> for ApiError {
    fn from(err: ScreenshotError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        metrics::counter!("screenshot_requests_total", "outcome" => self.0.metric_label())
            .increment(1);

        let body = match &self.0 {
            ScreenshotError::InvalidInput(errors) => {
                let headline = errors.representative();
                warn!("Rejected screenshot request: {}", errors);
                ApiErrorMessage {
                    code: self.0.code(),
                    message: format!("Invalid query parameter '{}': {}", headline.field, headline.reason),
                    field: Some(headline.field),
                    violations: errors.iter().cloned().collect(),
                }
            }
            other => {
                if other.severity() == ErrorSeverity::Critical {
                    error!(alarm = true, code = other.code(), "Screenshot request failed: {}", other);
                } else if status.is_server_error() {
                    error!(code = other.code(), "Screenshot request failed: {}", other);
                }
                ApiErrorMessage {
                    code: other.code(),
                    message: other.to_string(),
                    field: None,
                    violations: Vec::new(),
                }
            }
        };

        (status, Json(ApiErrorBody { error: body })).into_response()
    }
}
