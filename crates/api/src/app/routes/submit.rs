use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

/// Accept a unit of work and answer `202 Accepted` with its handle.
pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    body: Bytes,
) -> axum::response::Response {
    match services.acceptor.accept(body).await {
        Ok(handle) => {
            let location = handle.status_url.clone();
            (
                StatusCode::ACCEPTED,
                [(header::LOCATION, location)],
                Json(dto::SubmitResponse::from(handle)),
            )
                .into_response()
        }
        Err(e) => errors::accept_error_to_response(e),
    }
}
