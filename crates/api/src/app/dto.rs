use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use asyncreply_infra::OperationHandle;

// -------------------------
// Request DTOs
// -------------------------

/// Query string of `GET /status/{id}`.
///
/// Values stay raw strings here so unknown modes can be reported as
/// `invalid_mode` rather than a generic extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "OnComplete")]
    pub on_complete: Option<String>,
    #[serde(rename = "OnPending")]
    pub on_pending: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub id: String,
    pub status_url: String,
    pub result_uri: String,
    pub result_uri_expires_at: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
}

impl From<OperationHandle> for SubmitResponse {
    fn from(handle: OperationHandle) -> Self {
        Self {
            id: handle.id.to_string(),
            status_url: handle.status_url,
            result_uri: handle.result_token.uri,
            result_uri_expires_at: handle.result_token.expires_at,
            submitted_at: handle.submitted_at,
        }
    }
}
