use std::{collections::HashMap, sync::Arc};

use uuid::Uuid;

use crate::{config::AuthConfig, db::dao::DaoContext, error::AppError};

use super::{
    catalog::{DEFAULT_PERMISSIONS, SYSTEM_ROLES, permission_name},
    jwt::JwtKeys,
    providers::{AuthProviders, LocalAuthProvider},
    session::SessionIssuer,
};

pub fn build_providers(cfg: &AuthConfig, daos: &DaoContext) -> Result<AuthProviders, AppError> {
    let issuer = SessionIssuer::new(
        daos.session(),
        daos.refresh_token(),
        JwtKeys::from_secret(cfg.jwt_secret.as_bytes()),
        cfg.into(),
    );
    let local_provider = LocalAuthProvider::new(
        issuer,
        daos.admin_user(),
        daos.role(),
        daos.activity_log(),
    );
    let mut providers = AuthProviders::new(cfg.provider).with_provider(Arc::new(local_provider))?;
    providers.set_active(cfg.provider)?;
    Ok(providers)
}

/// Ensures the permission catalog and system roles exist, adding grants the
/// roles are missing. Existing rows are never modified.
pub async fn seed_catalog(daos: &DaoContext) -> anyhow::Result<()> {
    let permissions = daos.permission();
    let mut ids: HashMap<String, Uuid> = permissions
        .list_all()
        .await?
        .into_iter()
        .map(|permission| (permission.name, permission.id))
        .collect();

    for (resource, action, description) in DEFAULT_PERMISSIONS {
        let name = permission_name(resource, action);
        if ids.contains_key(&name) {
            continue;
        }
        let created = permissions
            .create_permission(resource, action, Some(description.to_string()))
            .await?;
        tracing::info!("seeded permission {}", created.name);
        ids.insert(created.name, created.id);
    }

    let roles = daos.role();
    for system_role in SYSTEM_ROLES {
        let role = match roles.find_by_slug(system_role.slug).await? {
            Some(role) => role,
            None => {
                roles
                    .create_role(
                        system_role.name.to_string(),
                        system_role.slug.to_string(),
                        Some(system_role.description.to_string()),
                        true,
                    )
                    .await?
            }
        };

        let wanted: Vec<Uuid> = match system_role.permissions {
            None => ids.values().copied().collect(),
            Some(names) => names
                .iter()
                .filter_map(|name| ids.get(*name).copied())
                .collect(),
        };
        let added = roles.grant_missing(role.id, &wanted).await?;
        if added > 0 {
            tracing::info!(role = %role.slug, added, "granted missing permissions");
        }
    }

    Ok(())
}

pub async fn init_providers(
    auth_cfg: &AuthConfig,
    daos: &DaoContext,
) -> anyhow::Result<AuthProviders> {
    seed_catalog(daos).await?;
    let providers = build_providers(auth_cfg, daos)?;
    providers.active()?.seed_admin(auth_cfg).await?;
    Ok(providers)
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::{build_providers, seed_catalog};
    use crate::{
        auth::{
            catalog::{DEFAULT_PERMISSIONS, PROPERTY_MANAGER, SUPER_ADMIN},
            providers::AuthProviderId,
        },
        config::AuthConfig,
        db::{dao::DaoContext, entities::role_permission},
        test_helpers::{permission_model, role_model},
    };

    #[test]
    fn builds_local_provider_as_active() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let providers = build_providers(
            &AuthConfig::new("secret", "admin@example.com", "adminpassword"),
            &DaoContext::new(&db),
        )
        .expect("providers should build");

        assert_eq!(providers.active_id(), AuthProviderId::Local);
        assert!(providers.active().is_ok());
    }

    #[tokio::test]
    async fn seeding_a_complete_catalog_writes_nothing_new() {
        let catalog: Vec<_> = DEFAULT_PERMISSIONS
            .iter()
            .map(|(resource, action, _)| permission_model(resource, action))
            .collect();
        let super_admin = role_model("Super Admin", SUPER_ADMIN, true);
        let manager = role_model("Property Manager", PROPERTY_MANAGER, true);
        let grants = |role_id| -> Vec<role_permission::Model> {
            catalog
                .iter()
                .map(|permission| role_permission::Model {
                    id: uuid::Uuid::new_v4(),
                    created_at: crate::test_helpers::ts(),
                    role_id,
                    permission_id: permission.id,
                })
                .collect()
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([catalog.clone()])
            .append_query_results([[super_admin.clone()]])
            .append_query_results([grants(super_admin.id)])
            .append_query_results([[manager.clone()]])
            .append_query_results([grants(manager.id)])
            .into_connection();

        seed_catalog(&DaoContext::new(&db))
            .await
            .expect("seeding should succeed");
    }
}
