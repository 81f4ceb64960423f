//! Strongly-typed identifiers used across the system.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Identifier of an asynchronous operation.
///
/// This is the join key between the queued job, the result object in the
/// store, and every status lookup. Generated from 122 random bits (UUIDv4),
/// so collisions are cryptographically negligible and ids are not guessable
/// from one another.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(Uuid);

impl OperationId {
    /// Mint a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for OperationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for OperationId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<OperationId> for Uuid {
    fn from(value: OperationId) -> Self {
        value.0
    }
}

impl FromStr for OperationId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid =
            Uuid::from_str(s).map_err(|e| CoreError::invalid_id(format!("OperationId: {e}")))?;
        Ok(Self(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn fresh_ids_are_distinct() {
        let ids: HashSet<OperationId> = (0..1000).map(|_| OperationId::new()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn garbage_is_rejected() {
        let err = "not-a-uuid".parse::<OperationId>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidId(_)));
    }

    proptest! {
        #[test]
        fn display_parses_back(bits in any::<u128>()) {
            let id = OperationId::from_uuid(Uuid::from_u128(bits));
            let parsed: OperationId = id.to_string().parse().unwrap();
            prop_assert_eq!(parsed, id);
        }
    }
}
