use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, TransactionTrait,
    prelude::DateTimeWithTimeZone,
};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult, base::insert_stamped};
use crate::db::entities::refresh_token::{self, Entity as RefreshToken};

#[derive(Clone)]
pub struct RefreshTokenDao {
    db: DatabaseConnection,
}

impl DaoBase for RefreshTokenDao {
    type Entity = RefreshToken;
    const ENTITY_NAME: &'static str = "refresh token";

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn new_token(
    admin_user_id: Uuid,
    session_id: Uuid,
    token_hash: String,
    expires_at: DateTimeWithTimeZone,
) -> refresh_token::ActiveModel {
    refresh_token::ActiveModel {
        admin_user_id: Set(admin_user_id),
        session_id: Set(session_id),
        token_hash: Set(token_hash),
        expires_at: Set(expires_at),
        is_active: Set(true),
        last_used_at: Set(None),
        ..Default::default()
    }
}

impl RefreshTokenDao {
    pub async fn issue(
        &self,
        admin_user_id: Uuid,
        session_id: Uuid,
        token_hash: String,
        expires_at: DateTimeWithTimeZone,
    ) -> DaoResult<refresh_token::Model> {
        self.create(new_token(admin_user_id, session_id, token_hash, expires_at))
            .await
    }

    /// Looks a token up by digest; inactive or expired rows are filtered out.
    pub async fn find_usable(
        &self,
        token_hash: &str,
        now: DateTimeWithTimeZone,
    ) -> DaoResult<Option<refresh_token::Model>> {
        RefreshToken::find()
            .filter(refresh_token::Column::TokenHash.eq(token_hash))
            .filter(refresh_token::Column::IsActive.eq(true))
            .filter(refresh_token::Column::ExpiresAt.gt(now))
            .one(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    pub async fn touch(&self, id: Uuid) -> DaoResult<refresh_token::Model> {
        self.update(id, |active| {
            active.last_used_at = Set(Some(Utc::now().fixed_offset()));
        })
        .await
    }

    /// Retires `current` and stores its successor in one transaction. A token
    /// another request already retired yields [`DaoLayerError::Stale`].
    pub async fn rotate(
        &self,
        current: refresh_token::Model,
        token_hash: String,
        expires_at: DateTimeWithTimeZone,
    ) -> DaoResult<refresh_token::Model> {
        let txn = self.db.begin().await.map_err(DaoLayerError::from)?;
        let now = Utc::now().fixed_offset();
        let admin_user_id = current.admin_user_id;
        let session_id = current.session_id;

        let retired = RefreshToken::update_many()
            .col_expr(refresh_token::Column::IsActive, Expr::value(false))
            .col_expr(refresh_token::Column::LastUsedAt, Expr::value(now))
            .col_expr(refresh_token::Column::UpdatedAt, Expr::value(now))
            .filter(refresh_token::Column::Id.eq(current.id))
            .filter(refresh_token::Column::IsActive.eq(true))
            .exec(&txn)
            .await
            .map_err(DaoLayerError::from)?;
        if retired.rows_affected == 0 {
            return Err(DaoLayerError::Stale {
                entity: Self::ENTITY_NAME,
            });
        }

        let next = insert_stamped(
            &txn,
            new_token(admin_user_id, session_id, token_hash, expires_at),
        )
        .await?;
        txn.commit().await.map_err(DaoLayerError::from)?;
        Ok(next)
    }

    pub async fn revoke_for_session(&self, session_id: Uuid) -> DaoResult<u64> {
        self.revoke_where(refresh_token::Column::SessionId.eq(session_id))
            .await
    }

    pub async fn revoke_all_for(&self, admin_user_id: Uuid) -> DaoResult<u64> {
        self.revoke_where(refresh_token::Column::AdminUserId.eq(admin_user_id))
            .await
    }

    async fn revoke_where(
        &self,
        condition: impl sea_orm::sea_query::IntoCondition + Send,
    ) -> DaoResult<u64> {
        let result = RefreshToken::update_many()
            .col_expr(refresh_token::Column::IsActive, Expr::value(false))
            .col_expr(
                refresh_token::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(condition)
            .filter(refresh_token::Column::IsActive.eq(true))
            .exec(&self.db)
            .await
            .map_err(DaoLayerError::from)?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};
    use uuid::Uuid;

    use super::RefreshTokenDao;
    use crate::db::dao::{DaoBase, DaoLayerError};
    use crate::db::entities::refresh_token;
    use crate::test_helpers::{refresh_token_model, ts};

    #[tokio::test]
    async fn find_usable_returns_none_when_missing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<refresh_token::Model>::new()])
            .into_connection();
        let dao = RefreshTokenDao::new(&db);

        let result = dao
            .find_usable("missing-digest", ts())
            .await
            .expect("query should succeed");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn find_usable_returns_token_when_present() {
        let admin_id = Uuid::new_v4();
        let stored = refresh_token_model(admin_id, Uuid::new_v4(), "digest-1", true);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored.clone()]])
            .into_connection();
        let dao = RefreshTokenDao::new(&db);

        let token = dao
            .find_usable("digest-1", ts())
            .await
            .expect("query should succeed")
            .expect("token should exist");
        assert_eq!(token.admin_user_id, admin_id);
        assert_eq!(token.token_hash, "digest-1");
    }

    #[tokio::test]
    async fn rotate_returns_successor_bound_to_same_session() {
        let admin_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        let current = refresh_token_model(admin_id, session_id, "old", true);
        let successor = refresh_token_model(admin_id, session_id, "new", true);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([[successor.clone()]])
            .into_connection();
        let dao = RefreshTokenDao::new(&db);

        let next = dao
            .rotate(current, "new".to_string(), successor.expires_at)
            .await
            .expect("rotation should succeed");
        assert_eq!(next.token_hash, "new");
        assert_eq!(next.session_id, session_id);
    }

    #[tokio::test]
    async fn rotating_an_already_retired_token_mints_nothing() {
        let current = refresh_token_model(Uuid::new_v4(), Uuid::new_v4(), "old", true);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();
        let dao = RefreshTokenDao::new(&db);

        let err = dao
            .rotate(current, "new".to_string(), ts())
            .await
            .expect_err("a token can only be spent once");
        assert!(matches!(err, DaoLayerError::Stale { .. }));

        let sql = format!("{:?}", db.into_transaction_log());
        assert!(sql.contains("is_active"), "retire must require an active row: {sql}");
        assert!(!sql.contains("INSERT"), "no successor may be stored: {sql}");
    }

    #[tokio::test]
    async fn revoke_all_maps_database_errors() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_errors([DbErr::Custom("update failed".to_string())])
            .into_connection();
        let dao = RefreshTokenDao::new(&db);

        let err = dao
            .revoke_all_for(Uuid::new_v4())
            .await
            .expect_err("update should fail");
        assert!(matches!(err, DaoLayerError::Db(_)));
    }
}
