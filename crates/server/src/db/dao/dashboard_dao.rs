use sea_orm::sea_query::{Alias, Expr, Func, Query};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use super::{DaoLayerError, DaoResult};
use crate::db::entities::{
    approval_action, platform_user,
    property::{self, Entity as Property},
    property_inquiry, property_view,
};
use crate::domain::metrics::TimeWindow;

/// Read-only aggregate queries behind the dashboard.
#[derive(Clone)]
pub struct DashboardDao {
    db: DatabaseConnection,
}

/// Which listings a property count covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyScope {
    All,
    /// Active and published.
    Live,
    PendingApproval,
}

#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct CityRow {
    pub city: String,
    pub listings: i64,
    pub inquiries: Option<i64>,
    pub average_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct OwnerRow {
    pub owner_user_id: Uuid,
    pub listings: i64,
    pub inquiries: Option<i64>,
    pub views: Option<i64>,
}

fn created_in(column: impl ColumnTrait, window: Option<TimeWindow>) -> Condition {
    match window {
        Some(window) => Condition::all()
            .add(column.gte(window.start.fixed_offset()))
            .add(column.lt(window.end.fixed_offset())),
        None => Condition::all(),
    }
}

fn bigint_sum(column: property::Column) -> Expr {
    Func::cast_as(Func::sum(Expr::col(column)), Alias::new("BIGINT")).into()
}

impl DashboardDao {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub async fn count_properties(
        &self,
        scope: PropertyScope,
        window: Option<TimeWindow>,
    ) -> DaoResult<u64> {
        let query = Property::find().filter(created_in(property::Column::CreatedAt, window));
        let query = match scope {
            PropertyScope::All => query,
            PropertyScope::Live => query
                .filter(property::Column::IsActive.eq(true))
                .filter(property::Column::Status.eq("PUBLISHED")),
            PropertyScope::PendingApproval => {
                query.filter(property::Column::ApprovalStatus.eq("PENDING"))
            }
        };
        query.count(&self.db).await.map_err(DaoLayerError::from)
    }

    pub async fn count_inquiries(&self, window: Option<TimeWindow>) -> DaoResult<u64> {
        property_inquiry::Entity::find()
            .filter(created_in(property_inquiry::Column::CreatedAt, window))
            .count(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    pub async fn count_views(&self, window: Option<TimeWindow>) -> DaoResult<u64> {
        property_view::Entity::find()
            .filter(created_in(property_view::Column::CreatedAt, window))
            .count(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    pub async fn count_agents(&self, window: Option<TimeWindow>) -> DaoResult<u64> {
        platform_user::Entity::find()
            .filter(platform_user::Column::UserType.eq("AGENT"))
            .filter(created_in(platform_user::Column::CreatedAt, window))
            .count(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    /// Approval-log rows that moved a listing into `new_status`.
    pub async fn count_decisions(
        &self,
        new_status: &str,
        window: Option<TimeWindow>,
    ) -> DaoResult<u64> {
        approval_action::Entity::find()
            .filter(approval_action::Column::NewStatus.eq(new_status))
            .filter(created_in(approval_action::Column::CreatedAt, window))
            .count(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    /// `sum(price)` over approved listings last updated inside `window`.
    pub async fn approved_price_total(&self, window: TimeWindow) -> DaoResult<f64> {
        let total: Option<Option<f64>> = Property::find()
            .select_only()
            .column_as(property::Column::Price.sum(), "total")
            .filter(property::Column::ApprovalStatus.eq("APPROVED"))
            .filter(created_in(property::Column::UpdatedAt, Some(window)))
            .into_tuple()
            .one(&self.db)
            .await
            .map_err(DaoLayerError::from)?;
        Ok(total.flatten().unwrap_or(0.0))
    }

    pub async fn top_cities(&self, limit: u64) -> DaoResult<Vec<CityRow>> {
        Property::find()
            .select_only()
            .column(property::Column::City)
            .column_as(property::Column::Id.count(), "listings")
            .column_as(bigint_sum(property::Column::InquiryCount), "inquiries")
            .column_as(property::Column::Price.avg(), "average_price")
            .filter(property::Column::IsActive.eq(true))
            .group_by(property::Column::City)
            .order_by_desc(property::Column::Id.count())
            .limit(limit)
            .into_model::<CityRow>()
            .all(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    /// Agents ranked by listing volume; other owner types never take a slot.
    pub async fn top_agent_owners(&self, limit: u64) -> DaoResult<Vec<OwnerRow>> {
        let agent_ids = Query::select()
            .column(platform_user::Column::Id)
            .from(platform_user::Entity)
            .cond_where(platform_user::Column::UserType.eq("AGENT"))
            .to_owned();
        Property::find()
            .select_only()
            .column(property::Column::OwnerUserId)
            .column_as(property::Column::Id.count(), "listings")
            .column_as(bigint_sum(property::Column::InquiryCount), "inquiries")
            .column_as(bigint_sum(property::Column::ViewCount), "views")
            .filter(property::Column::OwnerUserId.in_subquery(agent_ids))
            .group_by(property::Column::OwnerUserId)
            .order_by_desc(property::Column::Id.count())
            .limit(limit)
            .into_model::<OwnerRow>()
            .all(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    pub async fn agents_by_ids(&self, ids: &[Uuid]) -> DaoResult<Vec<platform_user::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        platform_user::Entity::find()
            .filter(platform_user::Column::Id.is_in(ids.iter().copied()))
            .filter(platform_user::Column::UserType.eq("AGENT"))
            .all(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    pub async fn latest_properties(&self, limit: u64) -> DaoResult<Vec<property::Model>> {
        Property::find()
            .order_by_desc(property::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    pub async fn latest_inquiries(&self, limit: u64) -> DaoResult<Vec<property_inquiry::Model>> {
        property_inquiry::Entity::find()
            .order_by_desc(property_inquiry::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    pub async fn latest_decisions(&self, limit: u64) -> DaoResult<Vec<approval_action::Model>> {
        approval_action::Entity::find()
            .order_by_desc(approval_action::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use uuid::Uuid;

    use super::{DashboardDao, PropertyScope};
    use crate::domain::metrics::today;
    use crate::test_helpers::count_row;

    #[tokio::test]
    async fn windowed_count_filters_on_creation_time() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[count_row(7)]])
            .into_connection();
        let dao = DashboardDao::new(&db);

        let count = dao
            .count_properties(PropertyScope::Live, Some(today(chrono::Utc::now())))
            .await
            .expect("count should succeed");
        assert_eq!(count, 7);

        let sql = format!("{:?}", db.into_transaction_log());
        assert!(sql.contains("created_at"), "missing window filter: {sql}");
        assert!(sql.contains("PUBLISHED"), "missing scope filter: {sql}");
    }

    #[tokio::test]
    async fn top_cities_maps_grouped_rows() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[BTreeMap::from([
                ("city", Value::from("Pune")),
                ("listings", Value::BigInt(Some(12))),
                ("inquiries", Value::BigInt(None)),
                ("average_price", Value::Double(Some(4_500_000.0))),
            ])]])
            .into_connection();
        let dao = DashboardDao::new(&db);

        let cities = dao.top_cities(5).await.expect("query should succeed");
        assert_eq!(cities.len(), 1);
        assert_eq!(cities[0].city, "Pune");
        assert_eq!(cities[0].listings, 12);
        assert_eq!(cities[0].inquiries, None);
    }

    #[tokio::test]
    async fn agents_lookup_skips_query_for_no_ids() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let dao = DashboardDao::new(&db);

        let agents = dao
            .agents_by_ids(&[] as &[Uuid])
            .await
            .expect("empty lookup should succeed");
        assert!(agents.is_empty());
    }
}
