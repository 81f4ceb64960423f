//! Object-store keys.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::OperationId;

/// Prefix under which result objects are written by processors.
pub const RESULTS_PREFIX: &str = "results";

/// Suffix carried by every result object key.
pub const RESULT_SUFFIX: &str = ".blobdata";

/// A validated key of one object in the object store.
///
/// Keys are relative, `/`-separated and never contain `..` segments, so they
/// can be embedded in URLs and signed as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn parse(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(CoreError::invalid_object_key("key is empty"));
        }
        if raw.starts_with('/') {
            return Err(CoreError::invalid_object_key("key must be relative"));
        }
        if raw.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            return Err(CoreError::invalid_object_key(format!(
                "key has an empty or relative segment: {raw}"
            )));
        }
        if raw.chars().any(|c| c.is_control() || c == '?' || c == '#') {
            return Err(CoreError::invalid_object_key(format!(
                "key has a reserved character: {raw:?}"
            )));
        }
        Ok(Self(raw))
    }

    /// Key of the result object for an operation.
    pub fn for_result(id: OperationId) -> Self {
        Self(format!("{RESULTS_PREFIX}/{id}{RESULT_SUFFIX}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ObjectKey {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ObjectKey> for String {
    fn from(value: ObjectKey) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn result_key_is_derived_from_operation_id() {
        let id: OperationId = "6f1c1d3e-6d2a-4a57-9a7e-0b2c3d4e5f60".parse().unwrap();
        let key = ObjectKey::for_result(id);
        assert_eq!(
            key.as_str(),
            "results/6f1c1d3e-6d2a-4a57-9a7e-0b2c3d4e5f60.blobdata"
        );
        assert_eq!(ObjectKey::parse(key.as_str()).unwrap(), key);
    }

    #[test]
    fn traversal_and_absolute_keys_are_rejected() {
        for bad in ["", "/abs", "a/../b", "a//b", "./a", "a/b/", "a?b", "a#b"] {
            assert!(ObjectKey::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    proptest! {
        #[test]
        fn plain_segments_are_accepted(
            segs in proptest::collection::vec("[a-z0-9_-]{1,12}", 1..5)
        ) {
            let raw = segs.join("/");
            let key = ObjectKey::parse(raw.clone()).unwrap();
            prop_assert_eq!(key.as_str(), raw.as_str());
        }
    }
}
