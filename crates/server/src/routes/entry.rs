use std::sync::Arc;

use axum::{Router, middleware, routing::post};
use tower_http::trace::TraceLayer;

use crate::{
    middleware::{catch_panic_layer, json_error_middleware},
    state::AppState,
};

use super::{graphql, public};

pub const GRAPHQL_PATH: &str = "/graphql";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(GRAPHQL_PATH, post(graphql::execute))
        .merge(public::router())
        .with_state(state)
        .layer(middleware::from_fn(json_error_middleware))
        .layer(catch_panic_layer())
        .layer(TraceLayer::new_for_http())
}
