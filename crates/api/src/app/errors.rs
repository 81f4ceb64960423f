use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use asyncreply_auth::TokenValidationError;
use asyncreply_infra::{AcceptError, StatusError, StoreError};

pub fn accept_error_to_response(err: AcceptError) -> axum::response::Response {
    match err {
        AcceptError::SubmissionFailed(e) => {
            json_error(StatusCode::BAD_GATEWAY, "submission_failed", e.to_string())
        }
    }
}

pub fn status_error_to_response(err: StatusError) -> axum::response::Response {
    match err {
        e @ StatusError::InvalidMode { .. } => {
            json_error(StatusCode::BAD_REQUEST, "invalid_mode", e.to_string())
        }
        StatusError::StoreUnavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        e @ StoreError::NotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "not_found", e.to_string())
        }
        StoreError::Unavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
    }
}

pub fn token_error_to_response(err: TokenValidationError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
