use chrono::Utc;
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
    prelude::DateTimeWithTimeZone,
};
use uuid::Uuid;

use super::{
    DaoBase, DaoLayerError, DaoResult,
    activity_log_dao::{NewActivity, record_on},
    base::insert_stamped,
};
use crate::db::entities::{
    admin_session, admin_user,
    otp_code::{self, Entity as OtpCode},
    refresh_token,
};

#[derive(Clone)]
pub struct OtpDao {
    db: DatabaseConnection,
}

impl DaoBase for OtpDao {
    type Entity = OtpCode;
    const ENTITY_NAME: &'static str = "otp code";

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl OtpDao {
    /// Most recently issued code for the address, consumed or not.
    pub async fn latest(&self, email: &str, purpose: &str) -> DaoResult<Option<otp_code::Model>> {
        OtpCode::find()
            .filter(otp_code::Column::Email.eq(email))
            .filter(otp_code::Column::Purpose.eq(purpose))
            .order_by_desc(otp_code::Column::CreatedAt)
            .one(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    /// Consumes any outstanding code for the address and stores a new one.
    pub async fn issue(
        &self,
        email: &str,
        purpose: &str,
        code_hash: String,
        expires_at: DateTimeWithTimeZone,
    ) -> DaoResult<otp_code::Model> {
        let now = Utc::now().fixed_offset();
        let txn = self.db.begin().await.map_err(DaoLayerError::from)?;
        OtpCode::update_many()
            .col_expr(otp_code::Column::ConsumedAt, Expr::value(now))
            .col_expr(otp_code::Column::UpdatedAt, Expr::value(now))
            .filter(otp_code::Column::Email.eq(email))
            .filter(otp_code::Column::Purpose.eq(purpose))
            .filter(otp_code::Column::ConsumedAt.is_null())
            .exec(&txn)
            .await
            .map_err(DaoLayerError::from)?;
        let code = insert_stamped(
            &txn,
            otp_code::ActiveModel {
                email: Set(email.to_string()),
                purpose: Set(purpose.to_string()),
                code_hash: Set(code_hash),
                expires_at: Set(expires_at),
                attempts: Set(0),
                consumed_at: Set(None),
                ..Default::default()
            },
        )
        .await?;
        txn.commit().await.map_err(DaoLayerError::from)?;
        Ok(code)
    }

    /// Counts one verification attempt against an unconsumed code. Returns
    /// `false` once `max_attempts` is reached, so concurrent guesses cannot
    /// exceed the limit.
    pub async fn claim_attempt(&self, id: Uuid, max_attempts: i32) -> DaoResult<bool> {
        let result = OtpCode::update_many()
            .col_expr(
                otp_code::Column::Attempts,
                Expr::col(otp_code::Column::Attempts).add(1),
            )
            .col_expr(otp_code::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(otp_code::Column::Id.eq(id))
            .filter(otp_code::Column::Attempts.lt(max_attempts))
            .filter(otp_code::Column::ConsumedAt.is_null())
            .exec(&self.db)
            .await
            .map_err(DaoLayerError::from)?;
        Ok(result.rows_affected == 1)
    }

    /// Spends the code and applies the password reset in one transaction:
    /// new hash, every session and refresh token revoked, audit row written.
    /// A code spent by another request yields [`DaoLayerError::Stale`].
    /// Returns how many sessions were ended.
    pub async fn redeem_for_reset(
        &self,
        otp_id: Uuid,
        admin_user_id: Uuid,
        password_hash: String,
        audit: NewActivity,
    ) -> DaoResult<u64> {
        let now = Utc::now().fixed_offset();
        let txn = self.db.begin().await.map_err(DaoLayerError::from)?;

        let consumed = OtpCode::update_many()
            .col_expr(otp_code::Column::ConsumedAt, Expr::value(now))
            .col_expr(otp_code::Column::UpdatedAt, Expr::value(now))
            .filter(otp_code::Column::Id.eq(otp_id))
            .filter(otp_code::Column::ConsumedAt.is_null())
            .exec(&txn)
            .await
            .map_err(DaoLayerError::from)?;
        if consumed.rows_affected == 0 {
            return Err(DaoLayerError::Stale {
                entity: Self::ENTITY_NAME,
            });
        }

        let changed = admin_user::Entity::update_many()
            .col_expr(admin_user::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(admin_user::Column::UpdatedAt, Expr::value(now))
            .filter(admin_user::Column::Id.eq(admin_user_id))
            .exec(&txn)
            .await
            .map_err(DaoLayerError::from)?;
        if changed.rows_affected == 0 {
            return Err(DaoLayerError::not_found("admin user", admin_user_id));
        }

        let sessions = admin_session::Entity::update_many()
            .col_expr(admin_session::Column::IsActive, Expr::value(false))
            .col_expr(admin_session::Column::UpdatedAt, Expr::value(now))
            .filter(admin_session::Column::AdminUserId.eq(admin_user_id))
            .filter(admin_session::Column::IsActive.eq(true))
            .exec(&txn)
            .await
            .map_err(DaoLayerError::from)?;
        refresh_token::Entity::update_many()
            .col_expr(refresh_token::Column::IsActive, Expr::value(false))
            .col_expr(refresh_token::Column::UpdatedAt, Expr::value(now))
            .filter(refresh_token::Column::AdminUserId.eq(admin_user_id))
            .filter(refresh_token::Column::IsActive.eq(true))
            .exec(&txn)
            .await
            .map_err(DaoLayerError::from)?;
        record_on(&txn, audit).await?;

        txn.commit().await.map_err(DaoLayerError::from)?;
        Ok(sessions.rows_affected)
    }
}
