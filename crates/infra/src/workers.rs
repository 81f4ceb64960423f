//! In-process stand-in for the external processor (dev mode only).

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use asyncreply_core::ObjectKey;

use crate::queue::InMemoryJobQueue;
use crate::store::{ResultSink, WriteResult};

/// Handle to a spawned worker task.
#[derive(Debug)]
pub struct WorkerHandle {
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Stop the worker. Jobs still queued stay queued.
    pub fn shutdown(self) {
        self.join.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Drains an [`InMemoryJobQueue`] and publishes each payload, unchanged, as
/// the job's result object.
#[derive(Debug)]
pub struct EchoWorker;

impl EchoWorker {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(queue: Arc<InMemoryJobQueue>, sink: Arc<dyn ResultSink>) -> WorkerHandle {
        let join = tokio::spawn(async move {
            info!("echo worker started");
            loop {
                let job = queue.recv().await;
                let id = job.attributes.operation_id;
                let key = ObjectKey::for_result(id);
                match sink.put_if_absent(&key, job.payload).await {
                    Ok(WriteResult::Written) => debug!(operation_id = %id, "result published"),
                    Ok(WriteResult::AlreadyExists) => {
                        debug!(operation_id = %id, "result already present; skipped")
                    }
                    Err(e) => warn!(operation_id = %id, error = %e, "result publish failed"),
                }
            }
        });

        WorkerHandle { join }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use bytes::Bytes;
    use chrono::Utc;

    use asyncreply_core::OperationId;

    use crate::queue::{JobAttributes, JobQueue, JobRecord};
    use crate::store::{InMemoryObjectStore, ObjectStore};

    #[tokio::test]
    async fn queued_payload_becomes_the_result() {
        let queue = Arc::new(InMemoryJobQueue::new());
        let store = Arc::new(InMemoryObjectStore::new());
        let worker = EchoWorker::spawn(queue.clone(), store.clone());

        let id = OperationId::new();
        queue
            .enqueue(JobRecord {
                payload: Bytes::from_static(b"job-A"),
                attributes: JobAttributes {
                    operation_id: id,
                    submitted_at: Utc::now(),
                    status_url: format!("/status/{id}"),
                },
            })
            .await
            .unwrap();

        let key = ObjectKey::for_result(id);
        for _ in 0..100 {
            if store.exists(&key).await.unwrap() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(store.get(&key).await.unwrap(), Bytes::from_static(b"job-A"));
        assert!(queue.is_empty());
        worker.shutdown();
    }
}
