//! Picker routes. Controller paths may contain slashes, so one wildcard route carries
//! `<controller path>/browse` (GET) and `<controller path>/select` (POST).

use crate::handlers::picker::{browse, select};
use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::limit::RequestBodyLimitLayer;

/// Select posts carry a single id.
const SELECT_BODY_LIMIT: usize = 16 * 1024;

pub fn picker_routes(state: AppState) -> Router {
    Router::new()
        .route("/*path", get(browse).post(select))
        .layer(RequestBodyLimitLayer::new(SELECT_BODY_LIMIT))
        .with_state(state)
}
