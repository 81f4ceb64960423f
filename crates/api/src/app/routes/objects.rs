//! Object gateway: redeems delegated read tokens against the object store.
//!
//! Stands in for a cloud store's signed-URL endpoint, so token URIs issued by
//! this service resolve without any other infrastructure.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;

use asyncreply_auth::{TokenQuery, TokenValidationError};
use asyncreply_core::ObjectKey;

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn get_object(
    Extension(services): Extension<Arc<AppServices>>,
    Path(key): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    // A key that cannot exist can never carry a valid token.
    let Ok(key) = ObjectKey::parse(key) else {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", "invalid object key");
    };

    let query = match token_query(&params) {
        Ok(q) => q,
        Err(e) => return errors::token_error_to_response(e),
    };

    if let Err(e) = services.issuer.verify(&key, &query, Utc::now()) {
        tracing::debug!(object_key = %key, error = %e, "token redemption refused");
        return errors::token_error_to_response(e);
    }

    match services.store.get(&key).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

fn token_query(params: &HashMap<String, String>) -> Result<TokenQuery, TokenValidationError> {
    let field = |name: &str| params.get(name).ok_or(TokenValidationError::BadSignature);
    let timestamp = |name: &str| {
        field(name)?
            .parse::<i64>()
            .map_err(|_| TokenValidationError::InvalidTimeWindow)
    };

    Ok(TokenQuery {
        sp: field("sp")?.clone(),
        st: timestamp("st")?,
        se: timestamp("se")?,
        sig: field("sig")?.clone(),
    })
}
