use chrono::Utc;
use sea_orm::sea_query::{Expr, ExprTrait, LikeExpr};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, FromQueryResult, IntoActiveModel, Order, PaginatorTrait, PrimaryKeyTrait,
    QueryFilter, QueryOrder, QuerySelect, Select,
};
use uuid::Uuid;

use super::base_traits::{HasCreatedAtColumn, HasIdActiveModel, TimestampedActiveModel};
use super::error::{DaoLayerError, DaoResult};

#[derive(Debug, serde::Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: u64,
    pub page_size: u64,
    pub has_next: bool,
    pub total: Option<u64>,
}

impl<T> PaginatedResponse<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResponse<U> {
        PaginatedResponse {
            data: self.data.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            has_next: self.has_next,
            total: self.total,
        }
    }
}

#[derive(Debug, Clone)]
pub enum FilterOp {
    Eq(sea_orm::sea_query::Value),
    Compare {
        op: CompareOp,
        value: sea_orm::sea_query::Value,
    },
    Like { pattern: String, escape: char },
    Between {
        min: sea_orm::sea_query::Value,
        max: sea_orm::sea_query::Value,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum CompareOp {
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone)]
pub struct ColumnFilter<C> {
    pub column: C,
    pub op: FilterOp,
}

impl<C> ColumnFilter<C> {
    pub fn eq(column: C, value: impl Into<sea_orm::sea_query::Value>) -> Self {
        Self {
            column,
            op: FilterOp::Eq(value.into()),
        }
    }

    pub fn compare(column: C, op: CompareOp, value: impl Into<sea_orm::sea_query::Value>) -> Self {
        Self {
            column,
            op: FilterOp::Compare {
                op,
                value: value.into(),
            },
        }
    }

    /// Case-sensitive substring match; `%`, `_` and `\` in `needle` are escaped.
    pub fn contains(column: C, needle: &str) -> Self {
        let escaped = needle
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        Self {
            column,
            op: FilterOp::Like {
                pattern: format!("%{escaped}%"),
                escape: '\\',
            },
        }
    }
}

/// Stamps id and timestamps on a fresh row and inserts it on `conn`, which may
/// be a transaction.
pub async fn insert_stamped<A, C>(
    conn: &C,
    mut active: A,
) -> DaoResult<<A::Entity as EntityTrait>::Model>
where
    A: ActiveModelTrait + ActiveModelBehavior + HasIdActiveModel + TimestampedActiveModel + Send,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    C: ConnectionTrait,
{
    let now = Utc::now().fixed_offset();
    active.set_id(Uuid::new_v4());
    active.set_created_at(now);
    active.set_updated_at(now);
    active.insert(conn).await.map_err(DaoLayerError::from)
}

fn apply_filters<E>(select: Select<E>, filters: &[ColumnFilter<E::Column>]) -> Select<E>
where
    E: EntityTrait,
    E::Column: Clone,
{
    filters.iter().fold(select, |select, filter| match &filter.op {
        FilterOp::Eq(value) => select.filter(filter.column.clone().eq(value.clone())),
        FilterOp::Compare { op, value } => {
            let expr = Expr::col(filter.column.clone());
            let value = Expr::val(value.clone());
            let expr = match op {
                CompareOp::Lt => expr.lt(value),
                CompareOp::Lte => expr.lte(value),
                CompareOp::Gt => expr.gt(value),
                CompareOp::Gte => expr.gte(value),
            };
            select.filter(expr)
        }
        FilterOp::Like { pattern, escape } => select.filter(
            Expr::col(filter.column.clone()).like(LikeExpr::new(pattern).escape(*escape)),
        ),
        FilterOp::Between { min, max } => select.filter(
            Expr::col(filter.column.clone())
                .between(Expr::val(min.clone()), Expr::val(max.clone())),
        ),
    })
}

#[async_trait::async_trait]
pub trait DaoBase: Clone + Send + Sync + Sized
where
    <Self::Entity as EntityTrait>::Model:
        FromQueryResult + IntoActiveModel<<Self::Entity as EntityTrait>::ActiveModel> + Send + Sync,
    <Self::Entity as EntityTrait>::ActiveModel: ActiveModelTrait<Entity = Self::Entity>
        + ActiveModelBehavior
        + HasIdActiveModel
        + TimestampedActiveModel
        + Send,
    <<Self::Entity as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType:
        From<Uuid> + Send + Sync,
    Self::Entity: HasCreatedAtColumn,
{
    type Entity: EntityTrait + Send + Sync;
    const MAX_PAGE_SIZE: u64 = 100;
    /// Name used in not-found messages.
    const ENTITY_NAME: &'static str;

    fn new(db: &DatabaseConnection) -> Self;

    fn db(&self) -> &DatabaseConnection;

    async fn create(
        &self,
        data: impl IntoActiveModel<<Self::Entity as EntityTrait>::ActiveModel> + Send,
    ) -> DaoResult<<Self::Entity as EntityTrait>::Model> {
        insert_stamped(self.db(), data.into_active_model()).await
    }

    async fn find_by_id(&self, id: Uuid) -> DaoResult<<Self::Entity as EntityTrait>::Model> {
        let model = Self::Entity::find_by_id(id)
            .one(self.db())
            .await
            .map_err(DaoLayerError::from)?;

        model.ok_or(DaoLayerError::not_found(Self::ENTITY_NAME, id))
    }

    async fn find(
        &self,
        page: u64,
        page_size: u64,
        order: Option<(<Self::Entity as EntityTrait>::Column, Order)>,
        apply: impl FnOnce(Select<Self::Entity>) -> Select<Self::Entity> + Send,
    ) -> DaoResult<PaginatedResponse<<Self::Entity as EntityTrait>::Model>>
    where
        <Self::Entity as EntityTrait>::Column: Clone,
    {
        self.find_with_filters(page, page_size, order, &[], apply)
            .await
    }

    async fn find_with_filters(
        &self,
        page: u64,
        page_size: u64,
        order: Option<(<Self::Entity as EntityTrait>::Column, Order)>,
        filters: &[ColumnFilter<<Self::Entity as EntityTrait>::Column>],
        apply: impl FnOnce(Select<Self::Entity>) -> Select<Self::Entity> + Send,
    ) -> DaoResult<PaginatedResponse<<Self::Entity as EntityTrait>::Model>>
    where
        <Self::Entity as EntityTrait>::Column: Clone,
    {
        if page == 0 || page_size == 0 || page_size > Self::MAX_PAGE_SIZE {
            return Err(DaoLayerError::InvalidPagination { page, page_size });
        }

        let filtered = apply_filters(apply(Self::Entity::find()), filters);
        let ordered = match order {
            Some((column, order)) => filtered.order_by(column, order),
            None => filtered.order_by_desc(Self::Entity::created_at_column()),
        };
        let fetch_size = page_size.saturating_add(1);
        let offset = page.saturating_sub(1).saturating_mul(page_size);
        let mut data = ordered
            .limit(fetch_size)
            .offset(offset)
            .all(self.db())
            .await
            .map_err(DaoLayerError::from)?;

        let has_next = data.len() > page_size as usize;
        if has_next {
            data.truncate(page_size as usize);
        }

        Ok(PaginatedResponse {
            data,
            page,
            page_size,
            has_next,
            total: None,
        })
    }

    async fn count_with_filters(
        &self,
        filters: &[ColumnFilter<<Self::Entity as EntityTrait>::Column>],
    ) -> DaoResult<u64>
    where
        <Self::Entity as EntityTrait>::Column: Clone,
    {
        apply_filters(Self::Entity::find(), filters)
            .count(self.db())
            .await
            .map_err(DaoLayerError::from)
    }

    async fn update<F>(&self, id: Uuid, apply: F) -> DaoResult<<Self::Entity as EntityTrait>::Model>
    where
        F: for<'a> FnOnce(&'a mut <Self::Entity as EntityTrait>::ActiveModel) + Send,
    {
        let model = Self::Entity::find_by_id(id)
            .one(self.db())
            .await
            .map_err(DaoLayerError::from)?
            .ok_or(DaoLayerError::not_found(Self::ENTITY_NAME, id))?;

        let mut active = model.into_active_model();
        apply(&mut active);
        active.set_updated_at(Utc::now().fixed_offset());

        active.update(self.db()).await.map_err(DaoLayerError::from)
    }

    async fn delete(&self, id: Uuid) -> DaoResult<Uuid> {
        let result = Self::Entity::delete_by_id(id)
            .exec(self.db())
            .await
            .map_err(DaoLayerError::from)?;

        if result.rows_affected == 0 {
            return Err(DaoLayerError::not_found(Self::ENTITY_NAME, id));
        }

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnFilter, FilterOp};

    #[test]
    fn contains_escapes_like_wildcards() {
        let filter = ColumnFilter::contains((), "50%_off\\");

        match filter.op {
            FilterOp::Like { pattern, escape } => {
                assert_eq!(pattern, "%50\\%\\_off\\\\%");
                assert_eq!(escape, '\\');
            }
            other => panic!("unexpected filter: {other:?}"),
        }
    }
}
