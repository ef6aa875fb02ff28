use async_graphql::InputObject;
use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::catalog::permission_name,
    db::{
        dao::{ActivityLogDao, AdminUserDao, DaoBase, NewActivity, PermissionDao, RoleDao},
        entities::{admin_user_role, permission, role},
    },
    domain::text::slugify,
    error::AppError,
};

#[derive(Debug, Clone, InputObject)]
pub struct CreateRoleInput {
    pub name: String,
    /// Derived from `name` when omitted.
    pub slug: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct UpdateRoleInput {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct RoleService {
    roles: RoleDao,
    permissions: PermissionDao,
    admins: AdminUserDao,
    activity: ActivityLogDao,
}

impl RoleService {
    pub fn new(
        roles: RoleDao,
        permissions: PermissionDao,
        admins: AdminUserDao,
        activity: ActivityLogDao,
    ) -> Self {
        Self {
            roles,
            permissions,
            admins,
            activity,
        }
    }

    pub async fn list_roles(&self) -> Result<Vec<role::Model>, AppError> {
        Ok(self.roles.list_all().await?)
    }

    pub async fn get_role(&self, id: Uuid) -> Result<role::Model, AppError> {
        Ok(self.roles.find_by_id(id).await?)
    }

    pub async fn permissions_of(&self, role_id: Uuid) -> Result<Vec<permission::Model>, AppError> {
        Ok(self.roles.permissions_of(role_id).await?)
    }

    pub async fn list_permissions(&self) -> Result<Vec<permission::Model>, AppError> {
        Ok(self.permissions.list_all().await?)
    }

    pub async fn create_role(
        &self,
        actor: Uuid,
        input: CreateRoleInput,
    ) -> Result<role::Model, AppError> {
        let name = input.name.trim().to_string();
        let slug = slugify(input.slug.as_deref().unwrap_or(&name));
        if name.is_empty() || slug.is_empty() {
            return Err(AppError::bad_request("Role name must contain letters or digits"));
        }
        if self.roles.find_by_slug(&slug).await?.is_some() {
            return Err(AppError::conflict(format!("Role {slug} already exists")));
        }
        let (names, granted) = match input.permissions {
            Some(names) => self.resolve_permissions(names).await?,
            None => (Vec::new(), Vec::new()),
        };

        let ids: Vec<Uuid> = granted.iter().map(|permission| permission.id).collect();
        Ok(self
            .roles
            .create_with_grants(
                name,
                slug.clone(),
                input.description,
                &ids,
                NewActivity::new(Some(actor), "create_role", "role")
                    .with_details(json!({ "slug": slug, "permissions": names })),
            )
            .await?)
    }

    pub async fn update_role(
        &self,
        actor: Uuid,
        id: Uuid,
        input: UpdateRoleInput,
    ) -> Result<role::Model, AppError> {
        if input.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(AppError::bad_request("Role name must not be empty"));
        }

        let role = self
            .roles
            .update(id, move |active| {
                if let Some(name) = input.name {
                    active.name = Set(name.trim().to_string());
                }
                if let Some(description) = input.description {
                    active.description = Set(Some(description));
                }
            })
            .await?;
        self.activity
            .record(NewActivity::new(Some(actor), "update_role", "role").on(id))
            .await?;
        Ok(role)
    }

    pub async fn delete_role(&self, actor: Uuid, id: Uuid) -> Result<Uuid, AppError> {
        let role = self.roles.find_by_id(id).await?;
        if role.is_system_role {
            return Err(AppError::forbidden(format!(
                "System role {} cannot be deleted",
                role.slug
            )));
        }

        self.roles.delete(id).await?;
        self.activity
            .record(
                NewActivity::new(Some(actor), "delete_role", "role")
                    .on(id)
                    .with_details(json!({ "slug": role.slug })),
            )
            .await?;
        Ok(id)
    }

    /// Replaces the role's grants; every name must exist in the catalog.
    pub async fn set_permissions(
        &self,
        actor: Uuid,
        role_id: Uuid,
        names: Vec<String>,
    ) -> Result<Vec<permission::Model>, AppError> {
        let role = self.roles.find_by_id(role_id).await?;
        let (names, found) = self.resolve_permissions(names).await?;

        let ids: Vec<Uuid> = found.iter().map(|permission| permission.id).collect();
        self.roles
            .replace_permissions(
                role.id,
                &ids,
                NewActivity::new(Some(actor), "set_role_permissions", "role")
                    .on(role.id)
                    .with_details(json!({ "permissions": names })),
            )
            .await?;
        Ok(found)
    }

    /// Trims and dedups `names`, failing unless every one is in the catalog.
    async fn resolve_permissions(
        &self,
        names: Vec<String>,
    ) -> Result<(Vec<String>, Vec<permission::Model>), AppError> {
        let mut names: Vec<String> = names.into_iter().map(|n| n.trim().to_string()).collect();
        names.sort();
        names.dedup();

        let found = self.permissions.find_by_names(&names).await?;
        let unknown: Vec<&str> = names
            .iter()
            .filter(|name| !found.iter().any(|permission| &permission.name == *name))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(AppError::bad_request(format!(
                "Unknown permissions: {}",
                unknown.join(", ")
            )));
        }
        Ok((names, found))
    }

    pub async fn create_permission(
        &self,
        actor: Uuid,
        resource: &str,
        action: &str,
        description: Option<String>,
    ) -> Result<permission::Model, AppError> {
        let resource = slugify(resource);
        let action = slugify(action);
        if resource.is_empty() || action.is_empty() {
            return Err(AppError::bad_request("Resource and action are required"));
        }
        let name = permission_name(&resource, &action);
        if self.permissions.find_by_name(&name).await?.is_some() {
            return Err(AppError::conflict(format!("Permission {name} already exists")));
        }

        let permission = self
            .permissions
            .create_permission(&resource, &action, description)
            .await?;
        self.activity
            .record(
                NewActivity::new(Some(actor), "create_permission", "permission")
                    .on(permission.id),
            )
            .await?;
        Ok(permission)
    }

    pub async fn assign_role(
        &self,
        actor: Uuid,
        admin_id: Uuid,
        role_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<admin_user_role::Model, AppError> {
        if expires_at.is_some_and(|at| at <= Utc::now()) {
            return Err(AppError::bad_request("Role expiry must be in the future"));
        }
        let admin = self.admins.find_by_id(admin_id).await?;
        let role = self.roles.find_by_id(role_id).await?;
        let audit = NewActivity::new(Some(actor), "assign_role", "admin_user")
            .on(admin.id)
            .with_details(json!({ "role": role.slug }));
        let expires_at = expires_at.map(|at| at.fixed_offset());

        let assignment = match self.roles.find_assignment(admin.id, role.id).await? {
            Some(held) if held.is_live_at(Utc::now().fixed_offset()) => {
                return Err(AppError::conflict(format!(
                    "{} already holds role {}",
                    admin.email, role.slug
                )));
            }
            Some(lapsed) => {
                self.roles
                    .renew(lapsed, Some(actor), expires_at, audit)
                    .await?
            }
            None => {
                self.roles
                    .assign(admin.id, role.id, Some(actor), expires_at, audit)
                    .await?
            }
        };
        Ok(assignment)
    }

    pub async fn remove_role(
        &self,
        actor: Uuid,
        admin_id: Uuid,
        role_id: Uuid,
    ) -> Result<(), AppError> {
        let removed = self
            .roles
            .unassign(
                admin_id,
                role_id,
                NewActivity::new(Some(actor), "remove_role", "admin_user")
                    .on(admin_id)
                    .with_details(json!({ "role_id": role_id })),
            )
            .await?;
        if removed == 0 {
            return Err(AppError::not_found("Role assignment not found"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use uuid::Uuid;

    use super::{CreateRoleInput, RoleService};
    use crate::{
        db::{dao::DaoContext, entities::admin_user_role},
        test_helpers::{
            activity_model, admin_model, assignment_model, grant_model, permission_model,
            role_model,
        },
    };
    use crate::db::entities::role;

    fn service(db: &sea_orm::DatabaseConnection) -> RoleService {
        let daos = DaoContext::new(db);
        RoleService::new(
            daos.role(),
            daos.permission(),
            daos.admin_user(),
            daos.activity_log(),
        )
    }

    #[tokio::test]
    async fn create_role_slugifies_name_and_rejects_duplicates() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[role_model("Listing Reviewer", "listing_reviewer", false)]])
            .into_connection();

        let err = service(&db)
            .create_role(
                Uuid::new_v4(),
                CreateRoleInput {
                    name: "Listing Reviewer".to_string(),
                    slug: None,
                    description: None,
                    permissions: None,
                },
            )
            .await
            .expect_err("duplicate slug should fail");

        assert_eq!(err.code(), "CONFLICT");
        assert!(err.message().contains("listing_reviewer"));
    }

    #[tokio::test]
    async fn unknown_permission_on_create_leaves_no_role_behind() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<role::Model>::new()])
            .append_query_results([[permission_model("properties", "view")]])
            .into_connection();

        let err = service(&db)
            .create_role(
                Uuid::new_v4(),
                CreateRoleInput {
                    name: "Listing Reviewer".to_string(),
                    slug: None,
                    description: None,
                    permissions: Some(vec![
                        "properties:view".to_string(),
                        "properties:teleport".to_string(),
                    ]),
                },
            )
            .await
            .expect_err("unknown permission should fail");

        assert_eq!(err.code(), "BAD_USER_INPUT");
        assert!(err.message().contains("properties:teleport"));
        let sql = format!("{:?}", db.into_transaction_log());
        assert!(!sql.contains("INSERT"), "nothing may be written: {sql}");
    }

    #[tokio::test]
    async fn create_role_writes_role_and_grants_in_one_transaction() {
        let actor = Uuid::new_v4();
        let view = permission_model("properties", "view");
        let reviewer = role_model("Listing Reviewer", "listing_reviewer", false);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<role::Model>::new()])
            .append_query_results([[view.clone()]])
            .append_query_results([[reviewer.clone()]])
            .append_query_results([[grant_model(reviewer.id, view.id)]])
            .append_query_results([[activity_model(Some(actor), "create_role", true)]])
            .into_connection();

        let created = service(&db)
            .create_role(
                actor,
                CreateRoleInput {
                    name: "Listing Reviewer".to_string(),
                    slug: None,
                    description: None,
                    permissions: Some(vec![" properties:view ".to_string()]),
                },
            )
            .await
            .expect("role should be created");
        assert_eq!(created.slug, "listing_reviewer");

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 3, "two lookups then one transaction: {log:?}");
        let txn = format!("{:?}", log[2]);
        assert!(txn.contains("roles"), "{txn}");
        assert!(txn.contains("role_permissions"), "{txn}");
        assert!(txn.contains("activity_logs"), "{txn}");
    }

    #[tokio::test]
    async fn system_roles_cannot_be_deleted() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[role_model("Super Admin", "super_admin", true)]])
            .into_connection();

        let err = service(&db)
            .delete_role(Uuid::new_v4(), Uuid::new_v4())
            .await
            .expect_err("system role delete should fail");

        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[tokio::test]
    async fn custom_role_delete_is_audited() {
        let actor = Uuid::new_v4();
        let custom = role_model("Reviewer", "reviewer", false);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[custom.clone()]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([[activity_model(Some(actor), "delete_role", true)]])
            .into_connection();

        let deleted = service(&db)
            .delete_role(actor, custom.id)
            .await
            .expect("delete should succeed");
        assert_eq!(deleted, custom.id);
    }

    #[tokio::test]
    async fn unknown_permission_names_are_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[role_model("Reviewer", "reviewer", false)]])
            .append_query_results([[permission_model("properties", "view")]])
            .into_connection();

        let err = service(&db)
            .set_permissions(
                Uuid::new_v4(),
                Uuid::new_v4(),
                vec!["properties:view".into(), "properties:teleport".into()],
            )
            .await
            .expect_err("unknown permission should fail");

        assert_eq!(err.code(), "BAD_USER_INPUT");
        assert!(err.message().contains("properties:teleport"));
    }

    #[tokio::test]
    async fn duplicate_permission_is_a_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[permission_model("reports", "export")]])
            .into_connection();

        let err = service(&db)
            .create_permission(Uuid::new_v4(), "Reports", "export", None)
            .await
            .expect_err("duplicate permission should fail");

        assert_eq!(err.code(), "CONFLICT");
        assert!(err.message().contains("reports:export"));
    }

    #[tokio::test]
    async fn past_expiry_is_rejected_before_any_query() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = service(&db)
            .assign_role(
                Uuid::new_v4(),
                Uuid::new_v4(),
                Uuid::new_v4(),
                Some(Utc::now() - Duration::minutes(1)),
            )
            .await
            .expect_err("past expiry should fail");

        assert_eq!(err.code(), "BAD_USER_INPUT");
    }

    #[tokio::test]
    async fn assign_role_writes_assignment_with_attribution() {
        let actor = Uuid::new_v4();
        let admin = admin_model("ravi@example.com", true);
        let reviewer = role_model("Reviewer", "reviewer", false);
        let mut assignment = assignment_model(admin.id, reviewer.id, None);
        assignment.granted_by = Some(actor);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[admin.clone()]])
            .append_query_results([[reviewer.clone()]])
            .append_query_results([Vec::<admin_user_role::Model>::new()])
            .append_query_results([[assignment.clone()]])
            .append_query_results([[activity_model(Some(actor), "assign_role", true)]])
            .into_connection();

        let created = service(&db)
            .assign_role(actor, admin.id, reviewer.id, None)
            .await
            .expect("assignment should succeed");

        assert_eq!(created.granted_by, Some(actor));
    }

    #[tokio::test]
    async fn live_assignment_blocks_a_second_grant() {
        let admin = admin_model("ravi@example.com", true);
        let reviewer = role_model("Reviewer", "reviewer", false);
        let held = assignment_model(
            admin.id,
            reviewer.id,
            Some((Utc::now() + Duration::days(1)).fixed_offset()),
        );
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[admin.clone()]])
            .append_query_results([[reviewer.clone()]])
            .append_query_results([[held]])
            .into_connection();

        let err = service(&db)
            .assign_role(Uuid::new_v4(), admin.id, reviewer.id, None)
            .await
            .expect_err("live assignment should conflict");
        assert_eq!(err.code(), "CONFLICT");
    }

    #[tokio::test]
    async fn expired_assignment_can_be_granted_again() {
        let actor = Uuid::new_v4();
        let admin = admin_model("ravi@example.com", true);
        let reviewer = role_model("Reviewer", "reviewer", false);
        let lapsed = assignment_model(
            admin.id,
            reviewer.id,
            Some((Utc::now() - Duration::days(1)).fixed_offset()),
        );
        let mut renewed = lapsed.clone();
        renewed.granted_by = Some(actor);
        renewed.expires_at = None;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[admin.clone()]])
            .append_query_results([[reviewer.clone()]])
            .append_query_results([[lapsed.clone()]])
            .append_query_results([[renewed.clone()]])
            .append_query_results([[activity_model(Some(actor), "assign_role", true)]])
            .into_connection();

        let granted = service(&db)
            .assign_role(actor, admin.id, reviewer.id, None)
            .await
            .expect("expired assignment should not block a new grant");

        assert_eq!(granted.id, lapsed.id);
        assert_eq!(granted.granted_by, Some(actor));
        assert!(granted.is_live_at(Utc::now().fixed_offset()));
        let sql = format!("{:?}", db.into_transaction_log());
        assert!(sql.contains("UPDATE"), "expired row should be reused: {sql}");
    }

    #[tokio::test]
    async fn removing_missing_assignment_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let err = service(&db)
            .remove_role(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
            .await
            .expect_err("missing assignment should fail");

        assert_eq!(err.code(), "NOT_FOUND");
    }
}
