use chrono::Utc;
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set, TransactionTrait, prelude::DateTimeWithTimeZone,
};
use uuid::Uuid;

use super::{
    DaoBase, DaoLayerError, DaoResult,
    activity_log_dao::{NewActivity, record_on},
    base::insert_stamped,
    permission_dao::live_assignment,
};
use crate::db::entities::{
    admin_user_role,
    permission::{self, Entity as Permission},
    role::{self, Entity as Role},
    role_permission::{self, Entity as RolePermission},
};

#[derive(Clone)]
pub struct RoleDao {
    db: DatabaseConnection,
}

impl DaoBase for RoleDao {
    type Entity = Role;
    const ENTITY_NAME: &'static str = "role";

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl RoleDao {
    pub async fn find_by_slug(&self, slug: &str) -> DaoResult<Option<role::Model>> {
        Role::find()
            .filter(role::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    pub async fn create_role(
        &self,
        name: String,
        slug: String,
        description: Option<String>,
        is_system_role: bool,
    ) -> DaoResult<role::Model> {
        self.create(role::ActiveModel {
            name: Set(name),
            slug: Set(slug),
            description: Set(description),
            is_system_role: Set(is_system_role),
            ..Default::default()
        })
        .await
    }

    /// Inserts the role, its grants and the audit row in one transaction.
    pub async fn create_with_grants(
        &self,
        name: String,
        slug: String,
        description: Option<String>,
        permission_ids: &[Uuid],
        audit: NewActivity,
    ) -> DaoResult<role::Model> {
        let txn = self.db.begin().await.map_err(DaoLayerError::from)?;
        let role = insert_stamped(
            &txn,
            role::ActiveModel {
                name: Set(name),
                slug: Set(slug),
                description: Set(description),
                is_system_role: Set(false),
                ..Default::default()
            },
        )
        .await?;
        for permission_id in permission_ids {
            insert_stamped(
                &txn,
                role_permission::ActiveModel {
                    role_id: Set(role.id),
                    permission_id: Set(*permission_id),
                    ..Default::default()
                },
            )
            .await?;
        }
        record_on(&txn, audit.on(role.id)).await?;
        txn.commit().await.map_err(DaoLayerError::from)?;
        Ok(role)
    }

    pub async fn list_all(&self) -> DaoResult<Vec<role::Model>> {
        Role::find()
            .order_by_asc(role::Column::Name)
            .all(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    pub async fn permissions_of(&self, role_id: Uuid) -> DaoResult<Vec<permission::Model>> {
        let granted = Query::select()
            .column(role_permission::Column::PermissionId)
            .from(role_permission::Entity)
            .cond_where(role_permission::Column::RoleId.eq(role_id))
            .to_owned();
        Permission::find()
            .filter(permission::Column::Id.in_subquery(granted))
            .order_by_asc(permission::Column::Name)
            .all(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    /// Replaces the role's grants with `permission_ids` atomically.
    pub async fn replace_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
        audit: NewActivity,
    ) -> DaoResult<()> {
        let txn = self.db.begin().await.map_err(DaoLayerError::from)?;
        RolePermission::delete_many()
            .filter(role_permission::Column::RoleId.eq(role_id))
            .exec(&txn)
            .await
            .map_err(DaoLayerError::from)?;
        for permission_id in permission_ids {
            insert_stamped(
                &txn,
                role_permission::ActiveModel {
                    role_id: Set(role_id),
                    permission_id: Set(*permission_id),
                    ..Default::default()
                },
            )
            .await?;
        }
        record_on(&txn, audit).await?;
        txn.commit().await.map_err(DaoLayerError::from)
    }

    /// Adds grants that are missing; existing grants are left alone.
    pub async fn grant_missing(&self, role_id: Uuid, permission_ids: &[Uuid]) -> DaoResult<usize> {
        let existing: Vec<Uuid> = RolePermission::find()
            .filter(role_permission::Column::RoleId.eq(role_id))
            .all(&self.db)
            .await
            .map_err(DaoLayerError::from)?
            .into_iter()
            .map(|grant| grant.permission_id)
            .collect();

        let mut added = 0;
        for permission_id in permission_ids.iter().filter(|id| !existing.contains(id)) {
            insert_stamped(
                &self.db,
                role_permission::ActiveModel {
                    role_id: Set(role_id),
                    permission_id: Set(*permission_id),
                    ..Default::default()
                },
            )
            .await?;
            added += 1;
        }
        Ok(added)
    }

    /// Slugs of the roles the admin holds at `now`.
    pub async fn live_slugs_for(
        &self,
        admin_user_id: Uuid,
        now: DateTimeWithTimeZone,
    ) -> DaoResult<Vec<String>> {
        let held = Query::select()
            .column(admin_user_role::Column::RoleId)
            .from(admin_user_role::Entity)
            .cond_where(live_assignment(admin_user_id, now))
            .to_owned();
        let roles = Role::find()
            .filter(role::Column::Id.in_subquery(held))
            .order_by_asc(role::Column::Slug)
            .all(&self.db)
            .await
            .map_err(DaoLayerError::from)?;
        Ok(roles.into_iter().map(|role| role.slug).collect())
    }

    /// Any assignment row for the pair, expired or not.
    pub async fn find_assignment(
        &self,
        admin_user_id: Uuid,
        role_id: Uuid,
    ) -> DaoResult<Option<admin_user_role::Model>> {
        admin_user_role::Entity::find()
            .filter(admin_user_role::Column::AdminUserId.eq(admin_user_id))
            .filter(admin_user_role::Column::RoleId.eq(role_id))
            .one(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    /// Writes the assignment and its audit row in one transaction.
    pub async fn assign(
        &self,
        admin_user_id: Uuid,
        role_id: Uuid,
        granted_by: Option<Uuid>,
        expires_at: Option<DateTimeWithTimeZone>,
        audit: NewActivity,
    ) -> DaoResult<admin_user_role::Model> {
        let txn = self.db.begin().await.map_err(DaoLayerError::from)?;
        let assignment = insert_stamped(
            &txn,
            admin_user_role::ActiveModel {
                admin_user_id: Set(admin_user_id),
                role_id: Set(role_id),
                granted_by: Set(granted_by),
                expires_at: Set(expires_at),
                ..Default::default()
            },
        )
        .await?;
        record_on(&txn, audit).await?;
        txn.commit().await.map_err(DaoLayerError::from)?;
        Ok(assignment)
    }

    /// Reuses an expired assignment row for a fresh grant.
    pub async fn renew(
        &self,
        assignment: admin_user_role::Model,
        granted_by: Option<Uuid>,
        expires_at: Option<DateTimeWithTimeZone>,
        audit: NewActivity,
    ) -> DaoResult<admin_user_role::Model> {
        let txn = self.db.begin().await.map_err(DaoLayerError::from)?;
        let mut active = assignment.into_active_model();
        active.granted_by = Set(granted_by);
        active.expires_at = Set(expires_at);
        active.updated_at = Set(Utc::now().fixed_offset());
        let renewed = active.update(&txn).await.map_err(DaoLayerError::from)?;
        record_on(&txn, audit).await?;
        txn.commit().await.map_err(DaoLayerError::from)?;
        Ok(renewed)
    }

    pub async fn unassign(
        &self,
        admin_user_id: Uuid,
        role_id: Uuid,
        audit: NewActivity,
    ) -> DaoResult<u64> {
        let txn = self.db.begin().await.map_err(DaoLayerError::from)?;
        let result = admin_user_role::Entity::delete_many()
            .filter(admin_user_role::Column::AdminUserId.eq(admin_user_id))
            .filter(admin_user_role::Column::RoleId.eq(role_id))
            .exec(&txn)
            .await
            .map_err(DaoLayerError::from)?;
        if result.rows_affected > 0 {
            record_on(&txn, audit).await?;
        }
        txn.commit().await.map_err(DaoLayerError::from)?;
        Ok(result.rows_affected)
    }
}
