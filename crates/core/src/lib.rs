//! `asyncreply-core`: identity and addressing primitives.
//!
//! This crate contains **pure** building blocks (no IO): operation ids, object
//! keys and status URL derivation.

pub mod error;
pub mod id;
pub mod object_key;
pub mod operation;

pub use error::{CoreError, CoreResult};
pub use id::OperationId;
pub use object_key::ObjectKey;
pub use operation::{Operation, StatusEndpoint};
