use std::sync::Arc;

use async_graphql::Context;

use crate::{
    auth::{AdminIdentity, Identity},
    db::entities::permission,
    error::AppError,
    graphql::error::GqlResult,
    services::{ServiceContext, permission_service::RequestPermissions},
    state::AppState,
};

/// Everything a resolver may consult, built once per GraphQL request.
pub struct RequestContext {
    state: Arc<AppState>,
    services: ServiceContext,
    identity: Identity,
    bearer: Option<String>,
    user_agent: Option<String>,
    permissions: Option<RequestPermissions>,
}

impl RequestContext {
    pub fn new(
        state: Arc<AppState>,
        identity: Identity,
        bearer: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        let services = ServiceContext::from_state(&state);
        let permissions = identity
            .admin()
            .map(|admin| RequestPermissions::new(services.permissions(), admin.id));
        Self {
            state,
            services,
            identity,
            bearer,
            user_agent,
            permissions,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn services(&self) -> &ServiceContext {
        &self.services
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn bearer(&self) -> Option<&str> {
        self.bearer.as_deref()
    }

    pub fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }

    pub fn admin(&self) -> Result<&AdminIdentity, AppError> {
        self.identity
            .admin()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }

    fn request_permissions(&self) -> Result<&RequestPermissions, AppError> {
        self.permissions
            .as_ref()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }

    /// The calling admin, provided they hold `name`.
    pub async fn require(&self, name: &str) -> Result<&AdminIdentity, AppError> {
        let admin = self.admin()?;
        if self.request_permissions()?.has(name).await? {
            Ok(admin)
        } else {
            tracing::debug!(admin_id = %admin.id, permission = name, "permission denied");
            Err(AppError::forbidden(format!("Missing permission {name}")))
        }
    }

    pub async fn require_any(&self, names: &[&str]) -> Result<&AdminIdentity, AppError> {
        let admin = self.admin()?;
        if self.request_permissions()?.has_any(names).await? {
            Ok(admin)
        } else {
            Err(AppError::forbidden(format!(
                "Missing one of the permissions {}",
                names.join(", ")
            )))
        }
    }

    pub async fn effective_permissions(&self) -> Result<&[permission::Model], AppError> {
        self.request_permissions()?.all().await
    }
}

pub fn request<'a>(ctx: &Context<'a>) -> GqlResult<&'a RequestContext> {
    ctx.data::<RequestContext>()
}
