//! Delegation issuer (valet key).
//!
//! Mints read-only, single-object, time-windowed tokens and verifies them on
//! redemption. Issuing is a pure function of the object key, the current time
//! and the signing key: no IO, and the object does not have to exist yet.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use asyncreply_core::ObjectKey;

use crate::Permission;
use crate::token::{
    DelegatedAccessToken, TokenQuery, TokenValidationError, canonical_string, validate_window,
};

type HmacSha256 = Hmac<Sha256>;

/// Default forward validity of an issued token, in seconds.
pub const DEFAULT_VALIDITY_SECS: i64 = 10 * 60;

/// Default backdating of the start time, in seconds, to absorb clock drift
/// between the issuer and whoever redeems the token.
pub const DEFAULT_CLOCK_SKEW_SECS: i64 = 5 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DelegationError {
    /// No usable signing key: fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Secret used to sign delegated tokens.
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, DelegationError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(DelegationError::Configuration(
                "signing key is empty".to_string(),
            ));
        }
        Ok(Self(bytes))
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}

/// Token lifetime policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelegationPolicy {
    pub validity: Duration,
    pub clock_skew: Duration,
}

impl Default for DelegationPolicy {
    fn default() -> Self {
        Self {
            validity: Duration::seconds(DEFAULT_VALIDITY_SECS),
            clock_skew: Duration::seconds(DEFAULT_CLOCK_SKEW_SECS),
        }
    }
}

/// Issues and verifies delegated read tokens.
#[derive(Clone)]
pub struct DelegationIssuer {
    mac: HmacSha256,
    store_base: String,
    policy: DelegationPolicy,
}

impl std::fmt::Debug for DelegationIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegationIssuer")
            .field("store_base", &self.store_base)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl DelegationIssuer {
    /// Create an issuer.
    ///
    /// `store_base` is the address that redeems tokens; token URIs take the
    /// form `{store_base}/objects/{key}?sp=r&st=..&se=..&sig=..`.
    pub fn new(
        key: Option<SigningKey>,
        store_base: impl Into<String>,
        policy: DelegationPolicy,
    ) -> Result<Self, DelegationError> {
        let key = key.ok_or_else(|| {
            DelegationError::Configuration("no signing key available".to_string())
        })?;
        if policy.validity <= Duration::zero() || policy.clock_skew < Duration::zero() {
            return Err(DelegationError::Configuration(format!(
                "invalid token policy: validity={}s skew={}s",
                policy.validity.num_seconds(),
                policy.clock_skew.num_seconds()
            )));
        }
        let mac = HmacSha256::new_from_slice(&key.0)
            .map_err(|e| DelegationError::Configuration(format!("signing key rejected: {e}")))?;

        Ok(Self {
            mac,
            store_base: store_base.into().trim_end_matches('/').to_string(),
            policy,
        })
    }

    pub fn policy(&self) -> DelegationPolicy {
        self.policy
    }

    /// Issue a read token for `object_key`, valid around the current time.
    pub fn issue_read_token(&self, object_key: &ObjectKey) -> DelegatedAccessToken {
        self.issue_read_token_at(object_key, Utc::now())
    }

    /// Issue a read token valid from `now - clock_skew` to `now + validity`.
    pub fn issue_read_token_at(
        &self,
        object_key: &ObjectKey,
        now: DateTime<Utc>,
    ) -> DelegatedAccessToken {
        let permission = Permission::Read;
        let not_before = truncate_to_seconds(now - self.policy.clock_skew);
        let expires_at = truncate_to_seconds(now + self.policy.validity);

        let signature = self.sign(&canonical_string(
            permission.code(),
            object_key,
            not_before.timestamp(),
            expires_at.timestamp(),
        ));

        let query = TokenQuery {
            sp: permission.code().to_string(),
            st: not_before.timestamp(),
            se: expires_at.timestamp(),
            sig: signature.clone(),
        };
        let uri = format!(
            "{}/objects/{}?{}",
            self.store_base,
            object_key,
            query.to_query_string()
        );

        tracing::debug!(
            object_key = %object_key,
            expires_at = %expires_at,
            "issued delegated read token"
        );

        DelegatedAccessToken {
            object_key: object_key.clone(),
            permission,
            not_before,
            expires_at,
            signature,
            uri,
        }
    }

    /// Verify a redemption of `object_key` with the given query fields.
    ///
    /// The signature is checked (in constant time) before the window, so a
    /// forged window is reported as a bad signature.
    pub fn verify(
        &self,
        object_key: &ObjectKey,
        query: &TokenQuery,
        now: DateTime<Utc>,
    ) -> Result<Permission, TokenValidationError> {
        let permission = Permission::from_code(&query.sp)
            .ok_or_else(|| TokenValidationError::PermissionDenied(query.sp.clone()))?;

        let provided = URL_SAFE_NO_PAD
            .decode(query.sig.as_bytes())
            .map_err(|_| TokenValidationError::BadSignature)?;

        let mut mac = self.mac.clone();
        mac.update(canonical_string(permission.code(), object_key, query.st, query.se).as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| TokenValidationError::BadSignature)?;

        let not_before = DateTime::<Utc>::from_timestamp(query.st, 0)
            .ok_or(TokenValidationError::InvalidTimeWindow)?;
        let expires_at = DateTime::<Utc>::from_timestamp(query.se, 0)
            .ok_or(TokenValidationError::InvalidTimeWindow)?;
        validate_window(not_before, expires_at, now)?;

        Ok(permission)
    }

    fn sign(&self, canonical: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(canonical.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }
}

fn truncate_to_seconds(t: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(t.timestamp(), 0).unwrap_or(t)
}
