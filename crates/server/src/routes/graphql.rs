use std::sync::Arc;

use axum::{Json, extract::State};

use crate::{graphql::RequestContext, routes::middleware::RequestIdentity, state::AppState};

/// Executes one GraphQL operation. Errors travel inside the GraphQL
/// response, so the HTTP status stays 200 for resolver failures.
pub async fn execute(
    State(state): State<Arc<AppState>>,
    caller: RequestIdentity,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    let RequestIdentity {
        identity,
        bearer,
        user_agent,
    } = caller;
    if let Some(admin) = identity.admin() {
        tracing::debug!(
            admin_id = %admin.id,
            operation = ?request.operation_name,
            "graphql request"
        );
    }
    let context = RequestContext::new(Arc::clone(&state), identity, bearer, user_agent);
    Json(state.schema.execute(request.data(context)).await)
}
