//! The two request-facing operations: accepting work and reporting status.
//!
//! Both are stateless across calls; the queue and the object store are the
//! only synchronization points.

pub mod acceptor;
pub mod coordinator;

pub use acceptor::{AcceptError, OperationHandle, WorkAcceptor};
pub use coordinator::{
    CompletionMode, DEFAULT_RETRY_AFTER, PendingMode, StatusCoordinator, StatusError,
    StatusOutcome,
};
