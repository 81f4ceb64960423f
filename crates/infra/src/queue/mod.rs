//! Outbound job queue (acceptor → external processor).
//!
//! The queue is an external collaborator: this module only defines the message
//! shape and the enqueue contract, plus adapters.
//!
//! ## Delivery
//!
//! - **One message per accepted submission**
//! - **No ordering or exactly-once guarantees** beyond what the transport gives
//! - **Processors must be idempotent**: a resubmitted request arrives as a new
//!   message with a new operation id

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use asyncreply_core::OperationId;

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis_streams;

pub use in_memory::InMemoryJobQueue;
#[cfg(feature = "redis")]
pub use redis_streams::RedisStreamsJobQueue;

/// Metadata travelling with every job.
///
/// The processor may use it to self-report; the core never reads it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAttributes {
    #[serde(rename = "operationId")]
    pub operation_id: OperationId,
    #[serde(rename = "submittedAt")]
    pub submitted_at: DateTime<Utc>,
    #[serde(rename = "statusURL")]
    pub status_url: String,
}

/// A queued unit of work: the raw request payload plus its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub payload: Bytes,
    pub attributes: JobAttributes,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum QueueError {
    #[error("queue unavailable: {0}")]
    Unavailable(String),
    #[error("queue rejected message: {0}")]
    Rejected(String),
}

/// Enqueue side of the job queue.
#[async_trait]
pub trait JobQueue: Send + Sync + 'static {
    async fn enqueue(&self, job: JobRecord) -> Result<(), QueueError>;
}

#[async_trait]
impl<Q> JobQueue for Arc<Q>
where
    Q: JobQueue + ?Sized,
{
    async fn enqueue(&self, job: JobRecord) -> Result<(), QueueError> {
        (**self).enqueue(job).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_use_wire_names() {
        let attrs = JobAttributes {
            operation_id: OperationId::new(),
            submitted_at: Utc::now(),
            status_url: "http://h/status/x".to_string(),
        };
        let json = serde_json::to_value(&attrs).unwrap();
        assert!(json.get("operationId").is_some());
        assert!(json.get("submittedAt").is_some());
        assert_eq!(json["statusURL"], "http://h/status/x");
    }
}
