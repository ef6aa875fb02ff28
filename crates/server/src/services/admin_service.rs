use async_graphql::InputObject;
use chrono::Utc;
use sea_orm::Set;
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::{password::hash_password, providers::local::normalize_email},
    db::{
        dao::{
            ActivityLogDao, AdminUserDao, DaoBase, NewActivity, NewAdminUser, PaginatedResponse,
            RefreshTokenDao, RoleDao, SessionDao,
        },
        entities::{activity_log, admin_user},
    },
    error::AppError,
};

#[derive(Debug, Clone, InputObject)]
pub struct CreateAdminInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct UpdateAdminInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

/// Admin accounts and the audit trail they leave.
#[derive(Clone)]
pub struct AdminService {
    admins: AdminUserDao,
    roles: RoleDao,
    sessions: SessionDao,
    refresh_tokens: RefreshTokenDao,
    activity: ActivityLogDao,
}

impl AdminService {
    pub fn new(
        admins: AdminUserDao,
        roles: RoleDao,
        sessions: SessionDao,
        refresh_tokens: RefreshTokenDao,
        activity: ActivityLogDao,
    ) -> Self {
        Self {
            admins,
            roles,
            sessions,
            refresh_tokens,
            activity,
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<admin_user::Model, AppError> {
        Ok(self.admins.find_by_id(id).await?)
    }

    pub async fn list(
        &self,
        page: u64,
        page_size: u64,
        search: Option<String>,
    ) -> Result<PaginatedResponse<admin_user::Model>, AppError> {
        let search = search
            .map(|term| term.trim().to_string())
            .filter(|term| !term.is_empty());
        Ok(self.admins.list(page, page_size, search).await?)
    }

    /// Role slugs currently held by the admin.
    pub async fn roles_of(&self, admin_id: Uuid) -> Result<Vec<String>, AppError> {
        Ok(self
            .roles
            .live_slugs_for(admin_id, Utc::now().fixed_offset())
            .await?)
    }

    pub async fn create(
        &self,
        actor: Uuid,
        input: CreateAdminInput,
    ) -> Result<admin_user::Model, AppError> {
        let email = normalize_email(&input.email);
        if !email.contains('@') {
            return Err(AppError::bad_request("A valid email address is required"));
        }
        if input.first_name.trim().is_empty() || input.last_name.trim().is_empty() {
            return Err(AppError::bad_request("First and last name are required"));
        }
        if self.admins.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict(format!(
                "An admin with email {email} already exists"
            )));
        }

        let password_hash = hash_password(&input.password)?;
        let admin = self
            .admins
            .create_admin(NewAdminUser {
                email,
                password_hash,
                first_name: input.first_name.trim().to_string(),
                last_name: input.last_name.trim().to_string(),
                phone: input.phone,
                is_verified: false,
            })
            .await?;

        self.audit(NewActivity::new(Some(actor), "create_admin", "admin_user").on(admin.id))
            .await?;
        Ok(admin)
    }

    pub async fn update(
        &self,
        actor: Uuid,
        id: Uuid,
        input: UpdateAdminInput,
    ) -> Result<admin_user::Model, AppError> {
        let admin = self
            .admins
            .update(id, move |active| {
                if let Some(first_name) = input.first_name {
                    active.first_name = Set(first_name.trim().to_string());
                }
                if let Some(last_name) = input.last_name {
                    active.last_name = Set(last_name.trim().to_string());
                }
                if let Some(phone) = input.phone {
                    active.phone = Set(Some(phone).filter(|phone| !phone.trim().is_empty()));
                }
            })
            .await?;

        self.audit(NewActivity::new(Some(actor), "update_admin", "admin_user").on(id))
            .await?;
        Ok(admin)
    }

    /// Deactivation also ends every session the admin holds.
    pub async fn set_active(
        &self,
        actor: Uuid,
        id: Uuid,
        is_active: bool,
    ) -> Result<admin_user::Model, AppError> {
        if actor == id && !is_active {
            return Err(AppError::bad_request("You cannot deactivate your own account"));
        }

        let admin = self.admins.set_active(id, is_active).await?;
        if !is_active {
            let ended = self.sessions.deactivate_all_for(id).await?;
            self.refresh_tokens.revoke_all_for(id).await?;
            tracing::info!(admin_id = %id, sessions = ended, "deactivated admin signed out");
        }

        let action = if is_active {
            "activate_admin"
        } else {
            "deactivate_admin"
        };
        self.audit(NewActivity::new(Some(actor), action, "admin_user").on(id))
            .await?;
        Ok(admin)
    }

    pub async fn activity(
        &self,
        page: u64,
        page_size: u64,
        admin_id: Option<Uuid>,
        resource: Option<String>,
    ) -> Result<PaginatedResponse<activity_log::Model>, AppError> {
        Ok(self
            .activity
            .list(page, page_size, admin_id, resource)
            .await?)
    }

    /// Records a sign-out in the audit trail.
    pub async fn record_logout(&self, admin_id: Uuid, everywhere: bool) -> Result<(), AppError> {
        self.audit(
            NewActivity::new(Some(admin_id), "logout", "admin_user")
                .on(admin_id)
                .with_details(json!({ "all_sessions": everywhere })),
        )
        .await
    }

    async fn audit(&self, entry: NewActivity) -> Result<(), AppError> {
        self.activity.record(entry).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use uuid::Uuid;

    use super::{AdminService, CreateAdminInput, UpdateAdminInput};
    use crate::{
        db::dao::DaoContext,
        test_helpers::{activity_model, admin_model},
    };

    fn service(db: &sea_orm::DatabaseConnection) -> AdminService {
        let daos = DaoContext::new(db);
        AdminService::new(
            daos.admin_user(),
            daos.role(),
            daos.session(),
            daos.refresh_token(),
            daos.activity_log(),
        )
    }

    fn input(email: &str) -> CreateAdminInput {
        CreateAdminInput {
            email: email.to_string(),
            password: "longenough".to_string(),
            first_name: "Ravi".to_string(),
            last_name: "Kumar".to_string(),
            phone: None,
        }
    }

    #[tokio::test]
    async fn create_rejects_taken_email() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[admin_model("ravi@example.com", true)]])
            .into_connection();

        let err = service(&db)
            .create(Uuid::new_v4(), input("Ravi@Example.com"))
            .await
            .expect_err("duplicate email should fail");

        assert_eq!(err.code(), "CONFLICT");
    }

    #[tokio::test]
    async fn create_rejects_short_password_before_writing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<crate::db::entities::admin_user::Model>::new()])
            .into_connection();
        let mut input = input("ravi@example.com");
        input.password = "short".to_string();

        let err = service(&db)
            .create(Uuid::new_v4(), input)
            .await
            .expect_err("short password should fail");

        assert_eq!(err.code(), "BAD_USER_INPUT");
    }

    #[tokio::test]
    async fn create_writes_admin_and_audit_row() {
        let actor = Uuid::new_v4();
        let created = admin_model("ravi@example.com", true);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<crate::db::entities::admin_user::Model>::new()])
            .append_query_results([[created.clone()]])
            .append_query_results([[activity_model(Some(actor), "create_admin", true)]])
            .into_connection();

        let admin = service(&db)
            .create(actor, input("ravi@example.com"))
            .await
            .expect("create should succeed");

        assert_eq!(admin.id, created.id);
    }

    #[tokio::test]
    async fn update_applies_only_given_fields() {
        let actor = Uuid::new_v4();
        let mut updated = admin_model("ravi@example.com", true);
        updated.first_name = "Ravindra".to_string();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[admin_model("ravi@example.com", true)], [updated.clone()]])
            .append_query_results([[activity_model(Some(actor), "update_admin", true)]])
            .into_connection();

        let admin = service(&db)
            .update(
                actor,
                updated.id,
                UpdateAdminInput {
                    first_name: Some(" Ravindra ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("update should succeed");

        assert_eq!(admin.first_name, "Ravindra");
    }

    #[tokio::test]
    async fn self_deactivation_is_refused() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let actor = Uuid::new_v4();

        let err = service(&db)
            .set_active(actor, actor, false)
            .await
            .expect_err("self deactivation should fail");

        assert_eq!(err.code(), "BAD_USER_INPUT");
    }

    #[tokio::test]
    async fn deactivation_revokes_sessions_and_refresh_tokens() {
        let actor = Uuid::new_v4();
        let target = admin_model("ravi@example.com", true);
        let mut disabled = target.clone();
        disabled.is_active = false;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[target.clone()], [disabled.clone()]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                },
            ])
            .append_query_results([[activity_model(Some(actor), "deactivate_admin", true)]])
            .into_connection();

        let admin = service(&db)
            .set_active(actor, target.id, false)
            .await
            .expect("deactivation should succeed");
        assert!(!admin.is_active);

        let sql = format!("{:?}", db.into_transaction_log());
        assert!(sql.contains("admin_sessions"), "sessions not revoked: {sql}");
        assert!(sql.contains("refresh_tokens"), "refresh tokens not revoked: {sql}");
    }
}
