use chrono::Utc;
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection,
    EntityTrait, IntoActiveModel, Order, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use super::{
    ColumnFilter, CompareOp, DaoBase, DaoLayerError, DaoResult, HasIdActiveModel,
    PaginatedResponse, TimestampedActiveModel, base::insert_stamped,
};
use crate::db::entities::{
    approval_action,
    property::{self, Entity as Property},
    property_image, property_inquiry, property_price_history, property_seo,
    property_verification, property_view,
};

#[derive(Clone)]
pub struct PropertyDao {
    db: DatabaseConnection,
}

impl DaoBase for PropertyDao {
    type Entity = Property;
    const ENTITY_NAME: &'static str = "property";

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Listing filters; every `Some` narrows the result.
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    pub approval_status: Option<String>,
    pub status: Option<String>,
    pub city: Option<String>,
    pub property_type: Option<String>,
    pub listing_type: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
    pub owner_user_id: Option<Uuid>,
    pub search: Option<String>,
}

impl PropertyFilter {
    pub fn column_filters(&self) -> Vec<ColumnFilter<property::Column>> {
        let mut filters = Vec::new();
        if let Some(value) = &self.approval_status {
            filters.push(ColumnFilter::eq(property::Column::ApprovalStatus, value.clone()));
        }
        if let Some(value) = &self.status {
            filters.push(ColumnFilter::eq(property::Column::Status, value.clone()));
        }
        if let Some(value) = &self.city {
            filters.push(ColumnFilter::eq(property::Column::City, value.clone()));
        }
        if let Some(value) = &self.property_type {
            filters.push(ColumnFilter::eq(property::Column::PropertyType, value.clone()));
        }
        if let Some(value) = &self.listing_type {
            filters.push(ColumnFilter::eq(property::Column::ListingType, value.clone()));
        }
        if let Some(value) = self.min_price {
            filters.push(ColumnFilter::compare(
                property::Column::Price,
                CompareOp::Gte,
                value,
            ));
        }
        if let Some(value) = self.max_price {
            filters.push(ColumnFilter::compare(
                property::Column::Price,
                CompareOp::Lte,
                value,
            ));
        }
        if let Some(value) = self.is_active {
            filters.push(ColumnFilter::eq(property::Column::IsActive, value));
        }
        if let Some(value) = self.is_verified {
            filters.push(ColumnFilter::eq(property::Column::IsVerified, value));
        }
        if let Some(value) = self.owner_user_id {
            filters.push(ColumnFilter::eq(property::Column::OwnerUserId, value));
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            filters.push(ColumnFilter::contains(property::Column::Title, term));
        }
        filters
    }
}

impl PropertyDao {
    pub async fn list(
        &self,
        filter: &PropertyFilter,
        page: u64,
        page_size: u64,
        order: Option<(property::Column, Order)>,
    ) -> DaoResult<PaginatedResponse<property::Model>> {
        let filters = filter.column_filters();
        self.find_with_filters(page, page_size, order, &filters, |query| query)
            .await
    }

    /// Persists `updated` as-is.
    pub async fn save(&self, mut updated: property::ActiveModel) -> DaoResult<property::Model> {
        updated.set_updated_at(Utc::now().fixed_offset());
        updated.update(&self.db).await.map_err(DaoLayerError::from)
    }

    /// Persists `updated` and appends `history` in one transaction. The update
    /// only applies while `guard` still holds on the stored row; otherwise
    /// nothing is written and the result is [`DaoLayerError::Stale`].
    pub async fn save_with_history<H>(
        &self,
        mut updated: property::ActiveModel,
        guard: Condition,
        history: H,
    ) -> DaoResult<(property::Model, <H::Entity as EntityTrait>::Model)>
    where
        H: ActiveModelTrait
            + ActiveModelBehavior
            + HasIdActiveModel
            + TimestampedActiveModel
            + Send,
        <H::Entity as EntityTrait>::Model: IntoActiveModel<H>,
    {
        let txn = self.db.begin().await.map_err(DaoLayerError::from)?;
        updated.set_updated_at(Utc::now().fixed_offset());
        let property = Property::update(updated)
            .validate()
            .map_err(DaoLayerError::from)?
            .filter(guard)
            .exec(&txn)
            .await
            .map_err(DaoLayerError::stale_on_miss(Self::ENTITY_NAME))?;
        let appended = insert_stamped(&txn, history).await?;
        txn.commit().await.map_err(DaoLayerError::from)?;
        Ok((property, appended))
    }

    pub async fn approval_history(
        &self,
        property_id: Uuid,
    ) -> DaoResult<Vec<approval_action::Model>> {
        approval_action::Entity::find()
            .filter(approval_action::Column::PropertyId.eq(property_id))
            .order_by_desc(approval_action::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    pub async fn price_history(
        &self,
        property_id: Uuid,
    ) -> DaoResult<Vec<property_price_history::Model>> {
        property_price_history::Entity::find()
            .filter(property_price_history::Column::PropertyId.eq(property_id))
            .order_by_desc(property_price_history::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    pub async fn verification_history(
        &self,
        property_id: Uuid,
    ) -> DaoResult<Vec<property_verification::Model>> {
        property_verification::Entity::find()
            .filter(property_verification::Column::PropertyId.eq(property_id))
            .order_by_desc(property_verification::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    pub async fn find_seo(&self, property_id: Uuid) -> DaoResult<Option<property_seo::Model>> {
        property_seo::Entity::find()
            .filter(property_seo::Column::PropertyId.eq(property_id))
            .one(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    /// Inserts the SEO row or overwrites the existing one for the property.
    pub async fn upsert_seo(
        &self,
        mut values: property_seo::ActiveModel,
        property_id: Uuid,
    ) -> DaoResult<property_seo::Model> {
        values.property_id = Set(property_id);
        match self.find_seo(property_id).await? {
            Some(existing) => {
                values.id = Set(existing.id);
                values.created_at = Set(existing.created_at);
                values.set_updated_at(Utc::now().fixed_offset());
                values.update(&self.db).await.map_err(DaoLayerError::from)
            }
            None => insert_stamped(&self.db, values).await,
        }
    }

    pub async fn images(&self, property_id: Uuid) -> DaoResult<Vec<property_image::Model>> {
        property_image::Entity::find()
            .filter(property_image::Column::PropertyId.eq(property_id))
            .order_by_asc(property_image::Column::SortOrder)
            .order_by_asc(property_image::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }

    /// Adds an image; a new primary image demotes the previous one.
    pub async fn add_image(
        &self,
        image: property_image::ActiveModel,
        property_id: Uuid,
        is_primary: bool,
    ) -> DaoResult<property_image::Model> {
        let txn = self.db.begin().await.map_err(DaoLayerError::from)?;
        if is_primary {
            property_image::Entity::update_many()
                .col_expr(property_image::Column::IsPrimary, Expr::value(false))
                .filter(property_image::Column::PropertyId.eq(property_id))
                .filter(property_image::Column::IsPrimary.eq(true))
                .exec(&txn)
                .await
                .map_err(DaoLayerError::from)?;
        }
        let mut image = image;
        image.property_id = Set(property_id);
        image.is_primary = Set(is_primary);
        let stored = insert_stamped(&txn, image).await?;
        txn.commit().await.map_err(DaoLayerError::from)?;
        Ok(stored)
    }

    pub async fn remove_image(&self, image_id: Uuid) -> DaoResult<Uuid> {
        let result = property_image::Entity::delete_by_id(image_id)
            .exec(&self.db)
            .await
            .map_err(DaoLayerError::from)?;
        if result.rows_affected == 0 {
            return Err(DaoLayerError::not_found("property image", image_id));
        }
        Ok(image_id)
    }

    /// Bumps `view_count` and stores the view row atomically.
    pub async fn record_view(
        &self,
        property_id: Uuid,
        viewer_id: Option<Uuid>,
    ) -> DaoResult<property_view::Model> {
        let txn = self.db.begin().await.map_err(DaoLayerError::from)?;
        let bumped = Property::update_many()
            .col_expr(
                property::Column::ViewCount,
                Expr::col(property::Column::ViewCount).add(1),
            )
            .filter(property::Column::Id.eq(property_id))
            .exec(&txn)
            .await
            .map_err(DaoLayerError::from)?;
        if bumped.rows_affected == 0 {
            return Err(DaoLayerError::not_found(Self::ENTITY_NAME, property_id));
        }
        let view = insert_stamped(
            &txn,
            property_view::ActiveModel {
                property_id: Set(property_id),
                viewer_id: Set(viewer_id),
                ..Default::default()
            },
        )
        .await?;
        txn.commit().await.map_err(DaoLayerError::from)?;
        Ok(view)
    }

    /// Bumps `inquiry_count` and stores the inquiry atomically.
    pub async fn submit_inquiry(
        &self,
        mut inquiry: property_inquiry::ActiveModel,
        property_id: Uuid,
    ) -> DaoResult<property_inquiry::Model> {
        let txn = self.db.begin().await.map_err(DaoLayerError::from)?;
        let bumped = Property::update_many()
            .col_expr(
                property::Column::InquiryCount,
                Expr::col(property::Column::InquiryCount).add(1),
            )
            .filter(property::Column::Id.eq(property_id))
            .exec(&txn)
            .await
            .map_err(DaoLayerError::from)?;
        if bumped.rows_affected == 0 {
            return Err(DaoLayerError::not_found(Self::ENTITY_NAME, property_id));
        }
        inquiry.property_id = Set(property_id);
        let stored = insert_stamped(&txn, inquiry).await?;
        txn.commit().await.map_err(DaoLayerError::from)?;
        Ok(stored)
    }

    pub async fn inquiries(
        &self,
        property_id: Uuid,
    ) -> DaoResult<Vec<property_inquiry::Model>> {
        property_inquiry::Entity::find()
            .filter(property_inquiry::Column::PropertyId.eq(property_id))
            .order_by_desc(property_inquiry::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(DaoLayerError::from)
    }
}
