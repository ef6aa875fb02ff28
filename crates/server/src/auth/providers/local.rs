use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::{
        Claims, TokenBundle,
        catalog::SUPER_ADMIN,
        password::{hash_password, verify_against_decoy, verify_password},
        session::SessionIssuer,
    },
    config::AuthConfig,
    db::{
        dao::{ActivityLogDao, AdminUserDao, DaoBase, NewActivity, NewAdminUser, RoleDao},
        entities::admin_user,
    },
    error::AppError,
};

use super::{AuthProvider, AuthProviderId};

/// Email/password accounts stored in `admin_users`.
#[derive(Clone)]
pub struct LocalAuthProvider {
    issuer: SessionIssuer,
    admins: AdminUserDao,
    roles: RoleDao,
    activity: ActivityLogDao,
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl LocalAuthProvider {
    pub fn new(
        issuer: SessionIssuer,
        admins: AdminUserDao,
        roles: RoleDao,
        activity: ActivityLogDao,
    ) -> Self {
        Self {
            issuer,
            admins,
            roles,
            activity,
        }
    }

    async fn role_slugs(&self, admin_id: Uuid) -> Result<Vec<String>, AppError> {
        Ok(self
            .roles
            .live_slugs_for(admin_id, Utc::now().fixed_offset())
            .await?)
    }

    /// Audit writes on the login path never change its outcome.
    async fn audit(&self, entry: NewActivity) {
        if let Err(err) = self.activity.record(entry).await {
            tracing::warn!(error = %err, "failed to record login activity");
        }
    }

    async fn reject_login(&self, email: &str, admin: Option<&admin_user::Model>) -> AppError {
        let mut entry = NewActivity::new(admin.map(|a| a.id), "login", "admin_user")
            .failed()
            .with_details(json!({ "email": email }));
        if let Some(admin) = admin {
            entry = entry.on(admin.id);
        }
        self.audit(entry).await;
        AppError::invalid_credentials()
    }
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    fn id(&self) -> AuthProviderId {
        AuthProviderId::Local
    }

    async fn login(
        &self,
        email: &str,
        password: &str,
        user_agent: Option<String>,
    ) -> Result<TokenBundle, AppError> {
        let email = normalize_email(email);
        let Some(admin) = self.admins.find_by_email(&email).await? else {
            verify_against_decoy(password);
            return Err(self.reject_login(&email, None).await);
        };
        let password_ok = verify_password(password, &admin.password_hash);
        if !admin.is_active || !password_ok {
            return Err(self.reject_login(&email, Some(&admin)).await);
        }

        let roles = self.role_slugs(admin.id).await?;
        let bundle = self
            .issuer
            .create_session(admin.id, &admin.email, roles, user_agent)
            .await?;
        self.admins
            .set_last_login(admin.id, Utc::now().fixed_offset())
            .await?;
        self.audit(NewActivity::new(Some(admin.id), "login", "admin_user").on(admin.id))
            .await;

        tracing::info!(admin_id = %admin.id, session_id = %bundle.session_id, "admin logged in");
        Ok(bundle)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenBundle, AppError> {
        let stored = self
            .issuer
            .validate_refresh_token(refresh_token)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid or expired refresh token"))?;

        let admin = self.admins.find_by_id(stored.admin_user_id).await?;
        if !admin.is_active {
            return Err(AppError::unauthorized("Account is disabled"));
        }

        let roles = self.role_slugs(admin.id).await?;
        self.issuer.rotate(stored, &admin.email, roles).await
    }

    async fn verify(&self, access_token: &str) -> Option<Claims> {
        self.issuer.validate(access_token).await
    }

    async fn logout(&self, access_token: &str) -> Result<(), AppError> {
        self.issuer.revoke(access_token).await
    }

    async fn logout_all(&self, admin_id: Uuid) -> Result<u64, AppError> {
        self.issuer.revoke_all(admin_id).await
    }

    async fn seed_admin(&self, cfg: &AuthConfig) -> anyhow::Result<()> {
        let email = normalize_email(&cfg.admin_email);
        if let Some(existing) = self.admins.find_by_email(&email).await? {
            tracing::info!("admin user already present: {}", existing.email);
            return Ok(());
        }

        let password_hash = hash_password(&cfg.admin_password)
            .map_err(|e| anyhow::anyhow!("admin seed hash error: {e}"))?;
        let admin = self
            .admins
            .create_admin(NewAdminUser {
                email,
                password_hash,
                first_name: "Super".to_string(),
                last_name: "Admin".to_string(),
                phone: None,
                is_verified: true,
            })
            .await?;

        let role = self
            .roles
            .find_by_slug(SUPER_ADMIN)
            .await?
            .ok_or_else(|| anyhow::anyhow!("system role {SUPER_ADMIN} is missing"))?;
        self.roles
            .assign(
                admin.id,
                role.id,
                None,
                None,
                NewActivity::new(None, "assign_role", "admin_user")
                    .on(admin.id)
                    .with_details(json!({ "role": SUPER_ADMIN })),
            )
            .await?;

        tracing::info!("seeded admin user {}", admin.email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, DbErr, IntoMockRow, MockDatabase};

    use crate::{
        auth::{
            jwt::JwtKeys,
            password::hash_password,
            providers::AuthProvider,
            session::{SessionIssuer, SessionTtl},
            token::digest,
        },
        config::AuthConfig,
        db::{
            dao::DaoContext,
            entities::{admin_user, refresh_token, role},
        },
        error::AppError,
        test_helpers::{
            activity_model, admin_model, assignment_model, refresh_token_model, role_model,
            session_model,
        },
    };

    use super::{AuthProviderId, LocalAuthProvider, normalize_email};

    struct ProviderFixtureBuilder {
        mock: MockDatabase,
    }

    impl ProviderFixtureBuilder {
        fn new() -> Self {
            Self {
                mock: MockDatabase::new(DatabaseBackend::Postgres),
            }
        }

        fn with_query_results<T, I, II>(mut self, sets: II) -> Self
        where
            T: IntoMockRow,
            I: IntoIterator<Item = T>,
            II: IntoIterator<Item = I>,
        {
            self.mock = self.mock.append_query_results(sets);
            self
        }

        fn with_query_error(mut self, error: DbErr) -> Self {
            self.mock = self.mock.append_query_errors([error]);
            self
        }

        fn build(self) -> LocalAuthProvider {
            let db = self.mock.into_connection();
            let daos = DaoContext::new(&db);
            let issuer = SessionIssuer::new(
                daos.session(),
                daos.refresh_token(),
                JwtKeys::from_secret(b"provider-secret"),
                SessionTtl {
                    access_secs: 300,
                    session_hours: 24,
                    refresh_days: 30,
                },
            );
            LocalAuthProvider::new(issuer, daos.admin_user(), daos.role(), daos.activity_log())
        }
    }

    fn admin_with_password(password: &str, is_active: bool) -> admin_user::Model {
        let mut admin = admin_model("alice@example.com", is_active);
        admin.password_hash = hash_password(password).expect("hash should succeed");
        admin
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[tokio::test]
    async fn provider_id_is_local() {
        let provider = ProviderFixtureBuilder::new().build();

        assert_eq!(provider.id(), AuthProviderId::Local);
    }

    #[tokio::test]
    async fn login_rejects_unknown_email_even_when_audit_fails() {
        let provider = ProviderFixtureBuilder::new()
            .with_query_results([Vec::<admin_user::Model>::new()])
            .with_query_error(DbErr::Custom("audit table offline".to_string()))
            .build();

        let err = provider
            .login("nobody@example.com", "password123", None)
            .await
            .expect_err("login should fail");

        assert_eq!(err, AppError::invalid_credentials());
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let admin = admin_with_password("correct-password", true);
        let provider = ProviderFixtureBuilder::new()
            .with_query_results([[admin.clone()]])
            .with_query_results([[activity_model(Some(admin.id), "login", false)]])
            .build();

        let err = provider
            .login("alice@example.com", "wrong-password", None)
            .await
            .expect_err("login should fail");

        assert_eq!(err.code(), "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn login_rejects_inactive_account_with_correct_password() {
        let admin = admin_with_password("password123", false);
        let provider = ProviderFixtureBuilder::new()
            .with_query_results([[admin.clone()]])
            .with_query_results([[activity_model(Some(admin.id), "login", false)]])
            .build();

        let err = provider
            .login("alice@example.com", "password123", None)
            .await
            .expect_err("inactive admin should not log in");

        assert_eq!(err.code(), "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn login_issues_session_bound_tokens() {
        let admin = admin_with_password("password123", true);
        let session = session_model(admin.id, true);
        let provider = ProviderFixtureBuilder::new()
            .with_query_results([[admin.clone()]])
            .with_query_results([[role_model("Super Admin", "super_admin", true)]])
            .with_query_results([[session.clone()]])
            .with_query_results([[refresh_token_model(admin.id, session.id, "d", true)]])
            .with_query_results([[admin.clone()], [admin.clone()]])
            .with_query_results([[activity_model(Some(admin.id), "login", true)]])
            .with_query_results([[session.clone()]])
            .build();

        let bundle = provider
            .login(" Alice@Example.com ", "password123", Some("curl/8".to_string()))
            .await
            .expect("login should succeed");
        let claims = provider
            .verify(&bundle.access_token)
            .await
            .expect("fresh token should verify");

        assert_eq!(bundle.token_type, "Bearer");
        assert_eq!(bundle.session_id, session.id);
        assert_eq!(claims.role, "super_admin");
        assert_eq!(claims.admin_id(), Some(admin.id));
    }

    #[tokio::test]
    async fn refresh_rejects_unknown_token() {
        let provider = ProviderFixtureBuilder::new()
            .with_query_results([Vec::<refresh_token::Model>::new()])
            .build();

        let err = provider
            .refresh("unknown")
            .await
            .expect_err("refresh should fail");

        assert_eq!(err.code(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn refresh_rotates_within_the_same_session() {
        let admin = admin_model("alice@example.com", true);
        let session = session_model(admin.id, true);
        let stored = refresh_token_model(admin.id, session.id, &digest("raw"), true);
        let successor = refresh_token_model(admin.id, session.id, "next", true);
        let provider = ProviderFixtureBuilder::new()
            .with_query_results([[stored.clone()], [stored.clone()], [stored.clone()]])
            .with_query_results([[admin.clone()]])
            .with_query_results([Vec::<role::Model>::new()])
            .with_query_results([[session.clone()]])
            .with_query_results([[stored.clone()], [successor.clone()]])
            .with_query_results([[session.clone()], [session.clone()]])
            .build();

        let bundle = provider.refresh("raw").await.expect("refresh should succeed");

        assert_eq!(bundle.session_id, session.id);
        assert_ne!(bundle.refresh_token, "raw");
    }

    #[tokio::test]
    async fn seed_admin_skips_existing_account() {
        let provider = ProviderFixtureBuilder::new()
            .with_query_results([[admin_model("admin@example.com", true)]])
            .build();

        provider
            .seed_admin(&AuthConfig::new("secret", "Admin@Example.com", "adminpassword"))
            .await
            .expect("seed should be a no-op");
    }

    #[tokio::test]
    async fn seed_admin_creates_account_with_super_admin_role() {
        let admin = admin_model("admin@example.com", true);
        let super_admin = role_model("Super Admin", "super_admin", true);
        let provider = ProviderFixtureBuilder::new()
            .with_query_results([Vec::<admin_user::Model>::new()])
            .with_query_results([[admin.clone()]])
            .with_query_results([[super_admin.clone()]])
            .with_query_results([[assignment_model(admin.id, super_admin.id, None)]])
            .with_query_results([[activity_model(None, "assign_role", true)]])
            .build();

        provider
            .seed_admin(&AuthConfig::new("secret", "admin@example.com", "adminpassword"))
            .await
            .expect("seed should succeed");
    }

    #[tokio::test]
    async fn seed_admin_fails_without_system_role() {
        let provider = ProviderFixtureBuilder::new()
            .with_query_results([Vec::<admin_user::Model>::new()])
            .with_query_results([[admin_model("admin@example.com", true)]])
            .with_query_results([Vec::<role::Model>::new()])
            .build();

        let err = provider
            .seed_admin(&AuthConfig::new("secret", "admin@example.com", "adminpassword"))
            .await
            .expect_err("seed should fail");

        assert!(err.to_string().contains("super_admin"));
    }
}
