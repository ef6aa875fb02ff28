use uuid::Uuid;

use crate::{
    auth::{Identity, TokenBundle, providers::AuthProviders},
    error::AppError,
};

#[derive(Clone, Copy)]
pub struct AuthService<'a> {
    providers: &'a AuthProviders,
}

impl<'a> AuthService<'a> {
    pub fn new(providers: &'a AuthProviders) -> Self {
        Self { providers }
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        user_agent: Option<String>,
    ) -> Result<TokenBundle, AppError> {
        self.providers
            .active()?
            .login(email, password, user_agent)
            .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenBundle, AppError> {
        self.providers.active()?.refresh(refresh_token).await
    }

    /// Resolves a bearer token to an identity; every failure is `Anonymous`.
    pub async fn identify(&self, access_token: &str) -> Identity {
        let provider = match self.providers.active() {
            Ok(provider) => provider,
            Err(err) => {
                tracing::error!(error = %err, "no active auth provider");
                return Identity::Anonymous;
            }
        };
        match provider.verify(access_token).await {
            Some(claims) => Identity::from_claims(&claims),
            None => Identity::Anonymous,
        }
    }

    pub async fn logout(&self, access_token: &str) -> Result<(), AppError> {
        self.providers.active()?.logout(access_token).await
    }

    pub async fn logout_all(&self, admin_id: Uuid) -> Result<u64, AppError> {
        self.providers.active()?.logout_all(admin_id).await
    }
}
