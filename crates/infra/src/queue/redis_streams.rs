//! Redis Streams-backed job queue (durable, at-least-once delivery).
//!
//! Each accepted submission becomes one `XADD` entry on a single stream.
//! Processors consume the stream with their own consumer group; this side only
//! appends.
//!
//! ## Entry fields
//!
//! - `operation_id`, `submitted_at` (RFC 3339), `status_url`: job attributes
//! - `payload`: raw request bytes

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use super::{JobQueue, JobRecord, QueueError};

/// Default stream key for jobs
const DEFAULT_STREAM_KEY: &str = "asyncreply:jobs";

#[derive(Debug, Clone)]
pub struct RedisStreamsJobQueue {
    client: Arc<redis::Client>,
    stream_key: String,
}

impl RedisStreamsJobQueue {
    /// Create a new Redis Streams job queue.
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `stream_key` - stream key (default: "asyncreply:jobs")
    pub fn new(redis_url: impl AsRef<str>, stream_key: Option<String>) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            stream_key: stream_key.unwrap_or_else(|| DEFAULT_STREAM_KEY.to_string()),
        })
    }

    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }

    #[instrument(
        skip(self, job),
        fields(
            stream_key = %self.stream_key,
            operation_id = %job.attributes.operation_id
        ),
        err
    )]
    fn enqueue_sync(&self, job: JobRecord) -> Result<(), QueueError> {
        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;

        let _: String = redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("*")
            .arg("operation_id")
            .arg(job.attributes.operation_id.to_string())
            .arg("submitted_at")
            .arg(job.attributes.submitted_at.to_rfc3339())
            .arg("status_url")
            .arg(&job.attributes.status_url)
            .arg("payload")
            .arg(job.payload.as_ref())
            .query(&mut conn)
            .map_err(|e| QueueError::Rejected(format!("XADD failed: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl JobQueue for RedisStreamsJobQueue {
    async fn enqueue(&self, job: JobRecord) -> Result<(), QueueError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.enqueue_sync(job))
            .await
            .map_err(|e| QueueError::Unavailable(format!("enqueue task failed: {e}")))?
    }
}
