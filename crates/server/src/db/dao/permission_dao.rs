use sea_orm::sea_query::{Query, SelectStatement};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, prelude::DateTimeWithTimeZone,
};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult};
use crate::db::entities::{
    admin_user_role,
    permission::{self, Entity as Permission},
    role_permission,
};

#[derive(Clone)]
pub struct PermissionDao {
    db: DatabaseConnection,
}

impl DaoBase for PermissionDao {
    type Entity = Permission;
    const ENTITY_NAME: &'static str = "permission";

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Assignments of `admin_user_id` that have no expiry or expire after `now`.
pub(super) fn live_assignment(admin_user_id: Uuid, now: DateTimeWithTimeZone) -> Condition {
    Condition::all()
        .add(admin_user_role::Column::AdminUserId.eq(admin_user_id))
        .add(
            Condition::any()
                .add(admin_user_role::Column::ExpiresAt.is_null())
                .add(admin_user_role::Column::ExpiresAt.gt(now)),
        )
}

/// `SELECT permission_id FROM role_permissions WHERE role_id IN (roles held by
/// the admin and not expired at `now`)`.
fn granted_permission_ids(admin_user_id: Uuid, now: DateTimeWithTimeZone) -> SelectStatement {
    let held_roles = Query::select()
        .column(admin_user_role::Column::RoleId)
        .from(admin_user_role::Entity)
        .cond_where(live_assignment(admin_user_id, now))
        .to_owned();

    Query::select()
        .column(role_permission::Column::PermissionId)
        .from(role_permission::Entity)
        .cond_where(role_permission::Column::RoleId.in_subquery(held_roles))
        .to_owned()
}

impl PermissionDao {
    pub async fn find_by_name(&self, name: &str) -> DaoResult<Option<permission::Model>> {
        Permission::find()
            .filter(permission::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    pub async fn create_permission(
        &self,
        resource: &str,
        action: &str,
        description: Option<String>,
    ) -> DaoResult<permission::Model> {
        self.create(permission::ActiveModel {
            resource: Set(resource.to_string()),
            action: Set(action.to_string()),
            name: Set(format!("{resource}:{action}")),
            description: Set(description),
            ..Default::default()
        })
        .await
    }

    pub async fn list_all(&self) -> DaoResult<Vec<permission::Model>> {
        Permission::find()
            .order_by_asc(permission::Column::Name)
            .all(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    pub async fn find_by_names(&self, names: &[String]) -> DaoResult<Vec<permission::Model>> {
        Permission::find()
            .filter(permission::Column::Name.is_in(names.iter().cloned()))
            .all(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    /// Every distinct permission reachable through the admin's live roles.
    pub async fn effective_for(
        &self,
        admin_user_id: Uuid,
        now: DateTimeWithTimeZone,
    ) -> DaoResult<Vec<permission::Model>> {
        Permission::find()
            .filter(permission::Column::Id.in_subquery(granted_permission_ids(admin_user_id, now)))
            .order_by_asc(permission::Column::Name)
            .all(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    /// Counts how many of `names` the admin holds, in one round trip.
    pub async fn count_held(
        &self,
        admin_user_id: Uuid,
        names: &[String],
        now: DateTimeWithTimeZone,
    ) -> DaoResult<u64> {
        if names.is_empty() {
            return Ok(0);
        }
        Permission::find()
            .filter(permission::Column::Name.is_in(names.iter().cloned()))
            .filter(permission::Column::Id.in_subquery(granted_permission_ids(admin_user_id, now)))
            .count(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }
}
