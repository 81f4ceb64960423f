//! Infrastructure layer: queue and object store adapters, backoff, and the
//! acceptor / coordinator operations built on them.

pub mod backoff;
pub mod operations;
pub mod queue;
pub mod store;
pub mod workers;

pub use backoff::{BackoffError, BackoffSchedule};
pub use operations::{
    AcceptError, CompletionMode, OperationHandle, PendingMode, StatusCoordinator, StatusError,
    StatusOutcome, WorkAcceptor,
};
pub use queue::{InMemoryJobQueue, JobAttributes, JobQueue, JobRecord, QueueError};
pub use store::{InMemoryObjectStore, ObjectStore, ResultSink, StoreError, WriteResult};
pub use workers::{EchoWorker, WorkerHandle};
