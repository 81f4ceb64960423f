use axum::{
    routing::{get, post},
    Router,
};

pub mod objects;
pub mod status;
pub mod submit;
pub mod system;

/// Router for the request/reply endpoints and the object gateway.
pub fn router() -> Router {
    Router::new()
        .route("/submit", post(submit::submit))
        .route("/status/:id", get(status::get_status))
        .route("/objects/*key", get(objects::get_object))
}
