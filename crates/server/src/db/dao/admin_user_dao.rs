use sea_orm::sea_query::{Expr, ExprTrait, Func};
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, QueryFilter, Set};
use uuid::Uuid;

use super::{DaoBase, DaoResult, PaginatedResponse};
use crate::db::entities::admin_user::{self, Entity as AdminUser};

#[derive(Clone)]
pub struct AdminUserDao {
    db: DatabaseConnection,
}

impl DaoBase for AdminUserDao {
    type Entity = AdminUser;
    const ENTITY_NAME: &'static str = "admin user";

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewAdminUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub is_verified: bool,
}

fn lower_like(column: admin_user::Column, pattern: &str) -> Expr {
    Expr::expr(Func::lower(Expr::col(column))).like(pattern)
}

impl AdminUserDao {
    pub async fn find_by_email(&self, email: &str) -> DaoResult<Option<admin_user::Model>> {
        let email = email.to_string();
        self.find(1, 1, None, move |query| {
            query.filter(admin_user::Column::Email.eq(email))
        })
        .await
        .map(|response| response.data.into_iter().next())
    }

    pub async fn create_admin(&self, new: NewAdminUser) -> DaoResult<admin_user::Model> {
        self.create(admin_user::ActiveModel {
            email: Set(new.email),
            password_hash: Set(new.password_hash),
            first_name: Set(new.first_name),
            last_name: Set(new.last_name),
            phone: Set(new.phone),
            is_active: Set(true),
            is_verified: Set(new.is_verified),
            last_login_at: Set(None),
            ..Default::default()
        })
        .await
    }

    pub async fn set_last_login(
        &self,
        id: Uuid,
        at: sea_orm::prelude::DateTimeWithTimeZone,
    ) -> DaoResult<admin_user::Model> {
        self.update(id, move |active| {
            active.last_login_at = Set(Some(at));
        })
        .await
    }

    pub async fn set_active(&self, id: Uuid, is_active: bool) -> DaoResult<admin_user::Model> {
        self.update(id, move |active| {
            active.is_active = Set(is_active);
        })
        .await
    }

    /// Lists admins, optionally narrowed by a case-insensitive search over
    /// email and names.
    pub async fn list(
        &self,
        page: u64,
        page_size: u64,
        search: Option<String>,
    ) -> DaoResult<PaginatedResponse<admin_user::Model>> {
        self.find(page, page_size, None, move |query| match search {
            Some(term) => {
                let pattern = format!("%{}%", term.to_lowercase());
                query.filter(
                    Condition::any()
                        .add(lower_like(admin_user::Column::Email, &pattern))
                        .add(lower_like(admin_user::Column::FirstName, &pattern))
                        .add(lower_like(admin_user::Column::LastName, &pattern)),
                )
            }
            None => query,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase};
    use uuid::Uuid;

    use super::AdminUserDao;
    use crate::db::dao::{DaoBase, DaoLayerError};
    use crate::db::entities::admin_user;
    use crate::test_helpers::{admin_model, ts};

    #[tokio::test]
    async fn find_by_email_returns_match() {
        let admin = admin_model("alice@example.com", true);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[admin.clone()]])
            .into_connection();
        let dao = AdminUserDao::new(&db);

        let result = dao
            .find_by_email("alice@example.com")
            .await
            .expect("query should succeed");
        assert_eq!(result.map(|u| u.id), Some(admin.id));
    }

    #[tokio::test]
    async fn find_by_email_returns_none_when_missing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<admin_user::Model>::new()])
            .into_connection();
        let dao = AdminUserDao::new(&db);

        let result = dao
            .find_by_email("missing@example.com")
            .await
            .expect("query should succeed");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn set_last_login_propagates_not_found() {
        let missing_id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<admin_user::Model>::new()])
            .into_connection();
        let dao = AdminUserDao::new(&db);

        let err = dao
            .set_last_login(missing_id, ts())
            .await
            .expect_err("update should fail");
        assert!(matches!(
            err,
            DaoLayerError::NotFound { id, .. } if id == missing_id
        ));
    }
}
