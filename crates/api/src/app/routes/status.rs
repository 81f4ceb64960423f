use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::IntoResponse,
};

use asyncreply_core::OperationId;
use asyncreply_infra::{CompletionMode, PendingMode, StatusOutcome};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

/// Status of one operation.
///
/// Both the id and the mode parameters are validated before the object store
/// is touched.
pub async fn get_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(query): Query<dto::StatusQuery>,
) -> axum::response::Response {
    let id: OperationId = match id.parse() {
        Ok(id) => id,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("{e}"));
        }
    };

    let modes = CompletionMode::from_param(query.on_complete.as_deref()).and_then(|completion| {
        PendingMode::from_param(query.on_pending.as_deref()).map(|pending| (completion, pending))
    });
    let (completion, pending) = match modes {
        Ok(modes) => modes,
        Err(e) => return errors::status_error_to_response(e),
    };

    match services.coordinator.check(id, completion, pending).await {
        Ok(outcome) => outcome_to_response(outcome),
        Err(e) => errors::status_error_to_response(e),
    }
}

fn outcome_to_response(outcome: StatusOutcome) -> axum::response::Response {
    match outcome {
        StatusOutcome::Redirect(token) => {
            (StatusCode::FOUND, [(header::LOCATION, token.uri)]).into_response()
        }
        StatusOutcome::Inline(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response(),
        StatusOutcome::Pending {
            status_url,
            retry_after,
        } => (
            StatusCode::ACCEPTED,
            [
                (header::LOCATION, status_url),
                (header::RETRY_AFTER, retry_after.as_secs().to_string()),
            ],
        )
            .into_response(),
        StatusOutcome::TimedOut { .. } => StatusCode::NOT_FOUND.into_response(),
    }
}
