//! Object store capabilities.
//!
//! Access is split by capability:
//!
//! | Trait | Operations | Who gets it |
//! |-------|------------|-------------|
//! | [`ObjectStore`] | `exists`, `get` | status coordinator, object gateway |
//! | [`ResultSink`] | `put_if_absent` | external processor (and tests) |
//!
//! The coordinator never holds a `ResultSink`, so it cannot race the
//! processor on the result object.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use asyncreply_core::ObjectKey;

pub mod in_memory;

pub use in_memory::InMemoryObjectStore;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(ObjectKey),
    #[error("object store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a write-once put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteResult {
    Written,
    /// The object already existed; it was left untouched.
    AlreadyExists,
}

/// Read-only store access.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Whether an object exists at `key`.
    async fn exists(&self, key: &ObjectKey) -> Result<bool, StoreError>;

    /// Read a whole object.
    ///
    /// Returns `StoreError::NotFound` if it doesn't exist.
    async fn get(&self, key: &ObjectKey) -> Result<Bytes, StoreError>;
}

/// Write-once result publication.
///
/// Objects are immutable once written: a second put for the same key is a
/// no-op that reports `WriteResult::AlreadyExists`.
#[async_trait]
pub trait ResultSink: Send + Sync + 'static {
    async fn put_if_absent(&self, key: &ObjectKey, data: Bytes) -> Result<WriteResult, StoreError>;
}

#[async_trait]
impl<S> ObjectStore for Arc<S>
where
    S: ObjectStore + ?Sized,
{
    async fn exists(&self, key: &ObjectKey) -> Result<bool, StoreError> {
        (**self).exists(key).await
    }

    async fn get(&self, key: &ObjectKey) -> Result<Bytes, StoreError> {
        (**self).get(key).await
    }
}

#[async_trait]
impl<S> ResultSink for Arc<S>
where
    S: ResultSink + ?Sized,
{
    async fn put_if_absent(&self, key: &ObjectKey, data: Bytes) -> Result<WriteResult, StoreError> {
        (**self).put_if_absent(key, data).await
    }
}
