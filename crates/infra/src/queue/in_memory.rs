//! In-memory job queue for tests/dev.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{JobQueue, JobRecord, QueueError};

/// Jobs held before `enqueue` starts rejecting.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Bounded in-memory FIFO queue.
///
/// - No IO
/// - Single consumer side (`dequeue`/`recv`) standing in for the processor
/// - Full queue rejects new jobs instead of growing
#[derive(Debug)]
pub struct InMemoryJobQueue {
    jobs: Mutex<VecDeque<JobRecord>>,
    capacity: usize,
    notify: Notify,
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
            capacity,
            notify: Notify::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Take the oldest job, if any.
    pub fn dequeue(&self) -> Option<JobRecord> {
        self.jobs.lock().ok()?.pop_front()
    }

    /// Wait until a job is available and take it.
    pub async fn recv(&self) -> JobRecord {
        loop {
            let notified = self.notify.notified();
            if let Some(job) = self.dequeue() {
                return job;
            }
            notified.await;
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: JobRecord) -> Result<(), QueueError> {
        let mut jobs = self
            .jobs
            .lock()
            .map_err(|_| QueueError::Unavailable("queue lock poisoned".to_string()))?;
        if jobs.len() >= self.capacity {
            return Err(QueueError::Rejected(format!(
                "queue full ({} jobs)",
                self.capacity
            )));
        }
        jobs.push_back(job);
        drop(jobs);
        self.notify.notify_one();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::JobAttributes;
    use asyncreply_core::OperationId;
    use bytes::Bytes;
    use chrono::Utc;
    use std::sync::Arc;

    fn job(payload: &'static str) -> JobRecord {
        let id = OperationId::new();
        JobRecord {
            payload: Bytes::from_static(payload.as_bytes()),
            attributes: JobAttributes {
                operation_id: id,
                submitted_at: Utc::now(),
                status_url: format!("/status/{id}"),
            },
        }
    }

    #[tokio::test]
    async fn fifo_order() {
        let q = InMemoryJobQueue::new();
        q.enqueue(job("a")).await.unwrap();
        q.enqueue(job("b")).await.unwrap();

        assert_eq!(q.len(), 2);
        assert_eq!(q.dequeue().unwrap().payload, "a");
        assert_eq!(q.dequeue().unwrap().payload, "b");
        assert!(q.dequeue().is_none());
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn full_queue_rejects_until_drained() {
        let q = InMemoryJobQueue::with_capacity(2);
        q.enqueue(job("a")).await.unwrap();
        q.enqueue(job("b")).await.unwrap();

        let err = q.enqueue(job("c")).await.unwrap_err();
        assert!(matches!(err, QueueError::Rejected(_)));
        assert_eq!(q.len(), 2);

        q.dequeue().unwrap();
        q.enqueue(job("c")).await.unwrap();
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn default_queue_is_bounded() {
        assert_eq!(InMemoryJobQueue::new().capacity(), DEFAULT_CAPACITY);
    }

    #[tokio::test]
    async fn recv_wakes_on_enqueue() {
        let q = Arc::new(InMemoryJobQueue::new());
        let consumer = {
            let q = q.clone();
            tokio::spawn(async move { q.recv().await })
        };
        tokio::task::yield_now().await;

        q.enqueue(job("late")).await.unwrap();
        let got = consumer.await.unwrap();
        assert_eq!(got.payload, "late");
    }
}
