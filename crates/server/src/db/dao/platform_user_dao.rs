use sea_orm::{DatabaseConnection, Set};

use super::{ColumnFilter, DaoBase, DaoResult, PaginatedResponse};
use crate::db::entities::platform_user::{self, Entity as PlatformUser};

#[derive(Clone)]
pub struct PlatformUserDao {
    db: DatabaseConnection,
}

impl DaoBase for PlatformUserDao {
    type Entity = PlatformUser;
    const ENTITY_NAME: &'static str = "platform user";

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl PlatformUserDao {
    pub async fn list(
        &self,
        page: u64,
        page_size: u64,
        user_type: Option<&str>,
        search: Option<&str>,
    ) -> DaoResult<PaginatedResponse<platform_user::Model>> {
        let mut filters = Vec::new();
        if let Some(user_type) = user_type {
            filters.push(ColumnFilter::eq(platform_user::Column::UserType, user_type));
        }
        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            filters.push(ColumnFilter::contains(platform_user::Column::Name, term));
        }
        self.find_with_filters(page, page_size, None, &filters, |query| query)
            .await
    }

    pub async fn set_active(
        &self,
        id: uuid::Uuid,
        is_active: bool,
    ) -> DaoResult<platform_user::Model> {
        self.update(id, move |active| {
            active.is_active = Set(is_active);
        })
        .await
    }
}
