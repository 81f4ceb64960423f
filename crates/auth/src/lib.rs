//! `asyncreply-auth`: delegated-access (valet key) tokens.
//!
//! This crate is intentionally decoupled from HTTP and storage: it only mints
//! and checks signed, read-only, single-object capabilities.

pub mod issuer;
pub mod permissions;
pub mod token;

pub use issuer::{DelegationError, DelegationIssuer, DelegationPolicy, SigningKey};
pub use permissions::Permission;
pub use token::{DelegatedAccessToken, TokenQuery, TokenValidationError, validate_window};
