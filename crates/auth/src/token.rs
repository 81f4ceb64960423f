use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use asyncreply_core::ObjectKey;

use crate::Permission;

/// A signed, time-boxed capability to read exactly one object.
///
/// The token is redeemed directly against the object store (or the object
/// gateway standing in for it); the issuing service is not on the data path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatedAccessToken {
    /// The single object this token grants access to.
    pub object_key: ObjectKey,

    /// Granted permission (always read).
    pub permission: Permission,

    /// Start of the validity window (inclusive, whole seconds).
    pub not_before: DateTime<Utc>,

    /// End of the validity window (exclusive, whole seconds).
    pub expires_at: DateTime<Utc>,

    /// base64url HMAC-SHA256 over the canonical token string.
    pub signature: String,

    /// Fully-formed URI that redeems the token.
    pub uri: String,
}

impl DelegatedAccessToken {
    /// Query-string form of the token (without the leading `?`).
    pub fn query(&self) -> String {
        TokenQuery::from_token(self).to_query_string()
    }
}

/// Token fields as they travel in a redemption URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenQuery {
    /// Permission code.
    pub sp: String,
    /// Start of validity, unix seconds.
    pub st: i64,
    /// Expiry, unix seconds.
    pub se: i64,
    /// Signature.
    pub sig: String,
}

impl TokenQuery {
    pub fn from_token(token: &DelegatedAccessToken) -> Self {
        Self {
            sp: token.permission.code().to_string(),
            st: token.not_before.timestamp(),
            se: token.expires_at.timestamp(),
            sig: token.signature.clone(),
        }
    }

    pub fn to_query_string(&self) -> String {
        format!("sp={}&st={}&se={}&sig={}", self.sp, self.st, self.se, self.sig)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (start time is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expiry <= start)")]
    InvalidTimeWindow,

    #[error("token signature does not match")]
    BadSignature,

    #[error("token does not grant permission '{0}'")]
    PermissionDenied(String),
}

/// Canonical string covered by the signature.
///
/// Binding the object key, the permission and both window edges means none of
/// them can be altered without invalidating the token.
pub(crate) fn canonical_string(
    permission: &str,
    object_key: &ObjectKey,
    not_before: i64,
    expires_at: i64,
) -> String {
    format!("{permission}\n{object_key}\n{not_before}\n{expires_at}")
}

/// Deterministically validate a token's time window.
///
/// Note: this validates the *window* only. Signature checks happen in
/// [`crate::DelegationIssuer::verify`].
pub fn validate_window(
    not_before: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), TokenValidationError> {
    if expires_at <= not_before {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < not_before {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
