//! The operation model: identity, submission metadata and status location.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::OperationId;
use crate::object_key::ObjectKey;

/// Base address of the status coordinator.
///
/// Status URLs are never stored; they are recomputed from this base and the
/// operation id whenever they are needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEndpoint {
    base: String,
}

impl StatusEndpoint {
    /// Accepts an absolute `http(s)://` base or a root-relative path (`/api`).
    /// A trailing slash is dropped.
    pub fn new(base: impl Into<String>) -> Result<Self, CoreError> {
        let base = base.into();
        let trimmed = base.trim().trim_end_matches('/');
        let absolute = trimmed.starts_with("http://") || trimmed.starts_with("https://");
        if !(absolute || trimmed.is_empty() || trimmed.starts_with('/')) {
            return Err(CoreError::validation(format!(
                "status base must be an http(s) URL or a root-relative path, got {base:?}"
            )));
        }
        if absolute && trimmed.split_once("://").is_some_and(|(_, host)| host.is_empty()) {
            return Err(CoreError::validation("status base has no host"));
        }
        Ok(Self {
            base: trimmed.to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn status_url(&self, id: OperationId) -> String {
        format!("{}/status/{}", self.base, id)
    }
}

/// A submitted unit of asynchronous work.
///
/// There is no status field: an operation is resolved exactly when its result
/// object exists in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub submitted_at: DateTime<Utc>,
}

impl Operation {
    pub fn new(submitted_at: DateTime<Utc>) -> Self {
        Self {
            id: OperationId::new(),
            submitted_at,
        }
    }

    pub fn result_key(&self) -> ObjectKey {
        ObjectKey::for_result(self.id)
    }

    pub fn status_url(&self, endpoint: &StatusEndpoint) -> String {
        endpoint.status_url(self.id)
    }
}
