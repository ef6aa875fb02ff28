use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    prelude::DateTimeWithTimeZone,
};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult};
use crate::db::entities::admin_session::{self, Entity as AdminSession};

#[derive(Clone)]
pub struct SessionDao {
    db: DatabaseConnection,
}

impl DaoBase for SessionDao {
    type Entity = AdminSession;
    const ENTITY_NAME: &'static str = "session";

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl SessionDao {
    pub async fn open(
        &self,
        admin_user_id: Uuid,
        expires_at: DateTimeWithTimeZone,
        user_agent: Option<String>,
    ) -> DaoResult<admin_session::Model> {
        self.create(admin_session::ActiveModel {
            admin_user_id: Set(admin_user_id),
            expires_at: Set(expires_at),
            is_active: Set(true),
            last_seen_at: Set(Some(Utc::now().fixed_offset())),
            user_agent: Set(user_agent),
            ..Default::default()
        })
        .await
    }

    /// Returns the session only while it is active and unexpired at `now`.
    pub async fn find_live(
        &self,
        session_id: Uuid,
        now: DateTimeWithTimeZone,
    ) -> DaoResult<Option<admin_session::Model>> {
        AdminSession::find_by_id(session_id)
            .filter(admin_session::Column::IsActive.eq(true))
            .filter(admin_session::Column::ExpiresAt.gt(now))
            .one(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    pub async fn extend(
        &self,
        session_id: Uuid,
        expires_at: DateTimeWithTimeZone,
    ) -> DaoResult<admin_session::Model> {
        self.update(session_id, move |active| {
            active.expires_at = Set(expires_at);
            active.last_seen_at = Set(Some(Utc::now().fixed_offset()));
        })
        .await
    }

    /// Marks one session inactive. Returns the number of rows changed.
    pub async fn deactivate(&self, session_id: Uuid) -> DaoResult<u64> {
        let result = AdminSession::update_many()
            .col_expr(admin_session::Column::IsActive, Expr::value(false))
            .col_expr(
                admin_session::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(admin_session::Column::Id.eq(session_id))
            .filter(admin_session::Column::IsActive.eq(true))
            .exec(&self.db)
            .await
            .map_err(DaoLayerError::from)?;
        Ok(result.rows_affected)
    }

    pub async fn deactivate_all_for(&self, admin_user_id: Uuid) -> DaoResult<u64> {
        let result = AdminSession::update_many()
            .col_expr(admin_session::Column::IsActive, Expr::value(false))
            .col_expr(
                admin_session::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(admin_session::Column::AdminUserId.eq(admin_user_id))
            .filter(admin_session::Column::IsActive.eq(true))
            .exec(&self.db)
            .await
            .map_err(DaoLayerError::from)?;
        Ok(result.rows_affected)
    }
}
