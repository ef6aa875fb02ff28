use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

use crate::{auth::Identity, services::ServiceContext, state::AppState};

/// The token part of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Resolved caller of a request. Never rejects: a missing or bad token is
/// an anonymous caller, and resolvers decide what anonymous may do.
#[derive(Debug, Clone, Default)]
pub struct RequestIdentity {
    pub identity: Identity,
    pub bearer: Option<String>,
    pub user_agent: Option<String>,
}

impl FromRequestParts<Arc<AppState>> for RequestIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(resolved) = parts.extensions.get::<RequestIdentity>().cloned() {
            return Ok(resolved);
        }

        let bearer = bearer_token(&parts.headers);
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let identity = match bearer.as_deref() {
            Some(token) => {
                ServiceContext::from_state(state)
                    .auth(&state.auth_providers)
                    .identify(token)
                    .await
            }
            None => Identity::Anonymous,
        };

        let resolved = Self {
            identity,
            bearer,
            user_agent,
        };
        parts.extensions.insert(resolved.clone());
        Ok(resolved)
    }
}
