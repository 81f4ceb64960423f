//! Infrastructure wiring: queue, object store, issuer, acceptor, coordinator.

use std::sync::Arc;

use asyncreply_auth::DelegationIssuer;
use asyncreply_core::StatusEndpoint;
use asyncreply_infra::{
    EchoWorker, InMemoryJobQueue, InMemoryObjectStore, JobQueue, ObjectStore, StatusCoordinator,
    WorkAcceptor, WorkerHandle,
};

use crate::config::{AppConfig, ConfigError};

/// Shared handles used by every handler.
pub struct AppServices {
    pub acceptor: WorkAcceptor,
    pub coordinator: StatusCoordinator,
    pub issuer: Arc<DelegationIssuer>,
    pub store: Arc<dyn ObjectStore>,
}

impl AppServices {
    /// Wire services over explicit queue and store handles.
    pub fn new(
        config: &AppConfig,
        queue: Arc<dyn JobQueue>,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, ConfigError> {
        let issuer = Arc::new(
            DelegationIssuer::new(
                Some(config.signing_key.clone()),
                config.store_url.clone(),
                config.delegation,
            )
            .map_err(|e| ConfigError::Invalid {
                name: "ASYNCREPLY_SIGNING_KEY",
                message: e.to_string(),
            })?,
        );
        let endpoint = StatusEndpoint::new(config.base_url.clone()).map_err(|e| {
            ConfigError::Invalid {
                name: "ASYNCREPLY_BASE_URL",
                message: e.to_string(),
            }
        })?;

        let acceptor = WorkAcceptor::new(queue, issuer.clone(), endpoint.clone());
        let coordinator = StatusCoordinator::new(store.clone(), issuer.clone(), endpoint)
            .with_backoff(config.backoff)
            .with_retry_after(config.retry_after);

        Ok(Self {
            acceptor,
            coordinator,
            issuer,
            store,
        })
    }
}

/// Build services from configuration alone.
///
/// The job queue is Redis Streams when `USE_PERSISTENT_QUEUE` is set and the
/// `redis` feature is compiled in. Otherwise `ASYNCREPLY_DEV_MODE` must be
/// set: the queue is then a bounded in-memory one, drained by an in-process
/// [`EchoWorker`] into the in-memory object store.
///
/// Must be called from within a tokio runtime.
pub fn build_services(
    config: &AppConfig,
) -> Result<(AppServices, Option<WorkerHandle>), ConfigError> {
    if config.use_persistent_queue {
        #[cfg(feature = "redis")]
        {
            return build_persistent_services(config).map(|services| (services, None));
        }
        #[cfg(not(feature = "redis"))]
        {
            if !config.dev_mode {
                return Err(ConfigError::Invalid {
                    name: "USE_PERSISTENT_QUEUE",
                    message: "redis feature not enabled".to_string(),
                });
            }
            tracing::warn!(
                "USE_PERSISTENT_QUEUE=true but redis feature not enabled, falling back to in-memory"
            );
        }
    }

    if !config.dev_mode {
        return Err(ConfigError::Invalid {
            name: "ASYNCREPLY_DEV_MODE",
            message: "no persistent queue configured; set USE_PERSISTENT_QUEUE=true \
                      or ASYNCREPLY_DEV_MODE=true"
                .to_string(),
        });
    }

    let (services, worker) = build_dev_services(config)?;
    Ok((services, Some(worker)))
}

fn build_dev_services(config: &AppConfig) -> Result<(AppServices, WorkerHandle), ConfigError> {
    tracing::warn!(
        queue_capacity = config.queue_capacity,
        "dev mode: in-memory queue and object store; jobs are echoed back as results"
    );

    let queue = Arc::new(InMemoryJobQueue::with_capacity(config.queue_capacity));
    let store = Arc::new(InMemoryObjectStore::new());
    let worker = EchoWorker::spawn(queue.clone(), store.clone());

    let services = AppServices::new(config, queue, store)?;
    Ok((services, worker))
}

#[cfg(feature = "redis")]
fn build_persistent_services(config: &AppConfig) -> Result<AppServices, ConfigError> {
    let redis_url = config
        .redis_url
        .clone()
        .unwrap_or_else(|| "redis://localhost:6379".to_string());
    let queue = asyncreply_infra::queue::RedisStreamsJobQueue::new(&redis_url, None).map_err(
        |e| ConfigError::Invalid {
            name: "REDIS_URL",
            message: e.to_string(),
        },
    )?;
    tracing::info!(stream_key = queue.stream_key(), "using Redis Streams job queue");

    // TODO: object store adapter shared with out-of-process processors; until then only
    // in-process `ResultSink` writers can publish results here.
    let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new());
    AppServices::new(config, Arc::new(queue), store)
}

#[cfg(test)]
mod tests {
    use super::*;

    use asyncreply_auth::SigningKey;

    fn config() -> AppConfig {
        AppConfig::new(
            "http://work.local",
            SigningKey::new(b"k".to_vec()).unwrap(),
        )
    }

    #[tokio::test]
    async fn in_memory_wiring_requires_dev_mode() {
        let err = build_services(&config()).err().unwrap();
        assert!(matches!(
            err,
            ConfigError::Invalid { name: "ASYNCREPLY_DEV_MODE", .. }
        ));
    }

    #[tokio::test]
    async fn dev_mode_starts_the_echo_worker() {
        let mut config = config();
        config.dev_mode = true;

        let (services, worker) = build_services(&config).unwrap();
        let worker = worker.expect("dev mode spawns a worker");
        assert!(!worker.is_finished());

        let handle = services
            .acceptor
            .accept(bytes::Bytes::from_static(b"job-A"))
            .await
            .unwrap();
        let key = asyncreply_core::ObjectKey::for_result(handle.id);
        for _ in 0..100 {
            if services.store.exists(&key).await.unwrap() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(
            services.store.get(&key).await.unwrap(),
            bytes::Bytes::from_static(b"job-A")
        );
        worker.shutdown();
    }
}
