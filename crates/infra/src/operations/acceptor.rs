//! Work acceptor: mint an operation, enqueue its job, hand back a handle.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use asyncreply_auth::{DelegatedAccessToken, DelegationIssuer};
use asyncreply_core::{Operation, OperationId, StatusEndpoint};

use crate::queue::{JobAttributes, JobQueue, JobRecord, QueueError};

/// Everything a caller needs to follow an accepted operation.
///
/// The caller may poll `status_url`, or go straight to `result_token.uri`
/// once the result exists; both routes stay valid for the same operation.
#[derive(Debug, Clone)]
pub struct OperationHandle {
    pub id: OperationId,
    pub status_url: String,
    pub result_token: DelegatedAccessToken,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum AcceptError {
    /// Nothing was enqueued and no handle was issued; the caller may retry.
    #[error("submission failed: {0}")]
    SubmissionFailed(#[from] QueueError),
}

pub struct WorkAcceptor {
    queue: Arc<dyn JobQueue>,
    issuer: Arc<DelegationIssuer>,
    endpoint: StatusEndpoint,
}

impl WorkAcceptor {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        issuer: Arc<DelegationIssuer>,
        endpoint: StatusEndpoint,
    ) -> Self {
        Self {
            queue,
            issuer,
            endpoint,
        }
    }

    /// Accept one submission.
    ///
    /// Exactly one enqueue per call. Resubmitting the same body yields a new
    /// operation id; deduplication is the caller's concern.
    pub async fn accept(&self, body: Bytes) -> Result<OperationHandle, AcceptError> {
        let operation = Operation::new(Utc::now());
        let status_url = operation.status_url(&self.endpoint);
        let result_token = self.issuer.issue_read_token(&operation.result_key());

        let job = JobRecord {
            payload: body,
            attributes: JobAttributes {
                operation_id: operation.id,
                submitted_at: operation.submitted_at,
                status_url: status_url.clone(),
            },
        };

        if let Err(e) = self.queue.enqueue(job).await {
            warn!(operation_id = %operation.id, error = %e, "enqueue failed; submission rejected");
            return Err(e.into());
        }

        info!(operation_id = %operation.id, status_url = %status_url, "submission accepted");

        Ok(OperationHandle {
            id: operation.id,
            status_url,
            result_token,
            submitted_at: operation.submitted_at,
        })
    }
}
