mod auth;
mod docs;
mod models;

use aps_client::ApsError;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;
use tower_http::{services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::error;

use crate::{metrics, state::AppState};

pub fn build_router(state: AppState) -> Router {
    // `:id` is a urn for the status route and an object key for delete;
    // the router needs one parameter name per segment.
    let mut router = Router::new()
        .route("/healthz", get(health_check))
        .route("/readyz", get(health_check))
        .route("/metrics", get(metrics_export))
        .route("/api-docs/openapi.json", get(docs::openapi))
        .route("/api/auth/token", get(auth::viewer_token))
        .route(
            "/api/models",
            get(models::list_models).post(models::upload_model),
        )
        .route("/api/models/:id/status", get(models::model_status))
        .route("/api/models/:id", delete(models::delete_model))
        .route("/api/models/:id/", delete(models::delete_model));

    if let Some(dir) = &state.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TimeoutLayer::new(state.request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}

async fn metrics_export() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::export_prometheus(),
    )
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    PayloadTooLarge,
    Upstream(&'static str),
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ApiErrorBody<'a> {
    error: &'a str,
    message: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", Some(msg)),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg)),
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                Some("upload exceeds the configured size limit".to_string()),
            ),
            ApiError::Upstream(operation) => (
                StatusCode::BAD_GATEWAY,
                "upstream_error",
                Some(format!("{operation} failed upstream")),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", Some(msg)),
        };
        (status, Json(ApiErrorBody { error, message })).into_response()
    }
}

/// Maps a failed APS call to a client-facing error. Anything other than a
/// malformed reference is the upstream's fault and is logged and counted.
pub(crate) fn map_aps_err(operation: &'static str) -> impl FnOnce(ApsError) -> ApiError {
    move |err| upstream_failure(operation, err)
}

/// Delete is the one operation where a missing object is the caller's 404.
pub(crate) fn map_delete_err(object_key: &str) -> impl FnOnce(ApsError) -> ApiError + '_ {
    move |err| match err {
        ApsError::NotFound => {
            ApiError::NotFound(format!("no object named {object_key} in the bucket"))
        }
        other => upstream_failure("delete_object", other),
    }
}

fn upstream_failure(operation: &'static str, err: ApsError) -> ApiError {
    match err {
        ApsError::InvalidReference(err) => ApiError::BadRequest(err.to_string()),
        other => {
            error!(operation, error = %other, "aps call failed");
            metrics::UPSTREAM_ERRORS
                .with_label_values(&[operation])
                .inc();
            ApiError::Upstream(operation)
        }
    }
}
