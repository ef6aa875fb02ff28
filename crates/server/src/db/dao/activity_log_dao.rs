use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult, PaginatedResponse, base::insert_stamped};
use crate::db::entities::activity_log::{self, Entity as ActivityLog};

/// An audit row waiting to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub admin_user_id: Option<Uuid>,
    pub action: String,
    pub resource: String,
    pub resource_id: Option<Uuid>,
    pub success: bool,
    pub details: Option<serde_json::Value>,
}

impl NewActivity {
    pub fn new(admin_user_id: Option<Uuid>, action: &str, resource: &str) -> Self {
        Self {
            admin_user_id,
            action: action.to_string(),
            resource: resource.to_string(),
            resource_id: None,
            success: true,
            details: None,
        }
    }

    pub fn on(mut self, resource_id: Uuid) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn into_active_model(self) -> activity_log::ActiveModel {
        activity_log::ActiveModel {
            admin_user_id: Set(self.admin_user_id),
            action: Set(self.action),
            resource: Set(self.resource),
            resource_id: Set(self.resource_id),
            success: Set(self.success),
            details: Set(self.details),
            ..Default::default()
        }
    }
}

#[derive(Clone)]
pub struct ActivityLogDao {
    db: DatabaseConnection,
}

impl DaoBase for ActivityLogDao {
    type Entity = ActivityLog;
    const ENTITY_NAME: &'static str = "activity log";

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Writes `entry` on `conn`; composite mutations pass their transaction here.
pub async fn record_on<C: ConnectionTrait>(
    conn: &C,
    entry: NewActivity,
) -> DaoResult<activity_log::Model> {
    insert_stamped(conn, entry.into_active_model()).await
}

impl ActivityLogDao {
    pub async fn record(&self, entry: NewActivity) -> DaoResult<activity_log::Model> {
        record_on(&self.db, entry).await
    }

    pub async fn list(
        &self,
        page: u64,
        page_size: u64,
        admin_user_id: Option<Uuid>,
        resource: Option<String>,
    ) -> DaoResult<PaginatedResponse<activity_log::Model>> {
        self.find(page, page_size, None, move |query| {
            let query = match admin_user_id {
                Some(id) => query.filter(activity_log::Column::AdminUserId.eq(id)),
                None => query,
            };
            match resource {
                Some(resource) => query.filter(activity_log::Column::Resource.eq(resource)),
                None => query,
            }
        })
        .await
    }

    pub async fn latest(&self, limit: u64) -> DaoResult<Vec<activity_log::Model>> {
        ActivityLog::find()
            .order_by_desc(activity_log::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;
    use uuid::Uuid;

    use super::{ActivityLogDao, NewActivity};
    use crate::db::dao::DaoBase;
    use crate::test_helpers::activity_model;

    #[test]
    fn builder_marks_failures_and_targets() {
        let target = Uuid::new_v4();
        let entry = NewActivity::new(None, "login", "auth")
            .on(target)
            .failed()
            .with_details(json!({ "email": "x@example.com" }));

        assert!(!entry.success);
        assert_eq!(entry.resource_id, Some(target));
        assert_eq!(entry.details, Some(json!({ "email": "x@example.com" })));
    }

    #[tokio::test]
    async fn record_returns_inserted_row() {
        let admin_id = Uuid::new_v4();
        let stored = activity_model(Some(admin_id), "login", false);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored.clone()]])
            .into_connection();
        let dao = ActivityLogDao::new(&db);

        let row = dao
            .record(NewActivity::new(Some(admin_id), "login", "auth").failed())
            .await
            .expect("insert should succeed");
        assert_eq!(row, stored);
        assert!(!row.success);
    }
}
