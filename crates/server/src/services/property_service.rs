use async_graphql::{InputObject, SimpleObject};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, Condition, IntoActiveModel, Order, Set};
use serde_json::json;
use uuid::Uuid;

use crate::{
    db::{
        dao::{
            ActivityLogDao, DaoBase, NewActivity, PaginatedResponse, PlatformUserDao, PropertyDao,
            PropertyFilter,
        },
        entities::{
            approval_action, property, property_image, property_inquiry, property_price_history,
            property_seo, property_verification, property_view,
        },
    },
    domain::property::{
        ApprovalAction, ApprovalStatus, InquiryStatus, ListingType, PropertyType,
        PublicationStatus, SEO_DESCRIPTION_MAX, SEO_TITLE_MAX, TransitionError, default_seo,
        next_status,
    },
    error::AppError,
};

#[derive(Debug, Clone, InputObject)]
pub struct CreatePropertyInput {
    pub title: String,
    pub description: Option<String>,
    pub property_type: PropertyType,
    pub listing_type: ListingType,
    pub price: f64,
    pub area: f64,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: Option<String>,
    pub owner_user_id: Option<Uuid>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct UpdatePropertyInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub property_type: Option<PropertyType>,
    pub listing_type: Option<ListingType>,
    pub price: Option<f64>,
    pub area: Option<f64>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub owner_user_id: Option<Uuid>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct PropertyFilterInput {
    pub approval_status: Option<ApprovalStatus>,
    pub status: Option<PublicationStatus>,
    pub city: Option<String>,
    pub property_type: Option<PropertyType>,
    pub listing_type: Option<ListingType>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
    pub owner_user_id: Option<Uuid>,
    pub search: Option<String>,
}

impl TryFrom<PropertyFilterInput> for PropertyFilter {
    type Error = AppError;

    fn try_from(input: PropertyFilterInput) -> Result<Self, Self::Error> {
        if let (Some(min), Some(max)) = (input.min_price, input.max_price)
            && min > max
        {
            return Err(AppError::bad_request("minPrice must not exceed maxPrice"));
        }
        Ok(PropertyFilter {
            approval_status: input.approval_status.map(|s| s.as_str().to_string()),
            status: input.status.map(|s| s.as_str().to_string()),
            city: input.city.map(|city| city.trim().to_string()),
            property_type: input.property_type.map(|t| t.as_str().to_string()),
            listing_type: input.listing_type.map(|t| t.as_str().to_string()),
            min_price: input.min_price,
            max_price: input.max_price,
            is_active: input.is_active,
            is_verified: input.is_verified,
            owner_user_id: input.owner_user_id,
            search: input.search,
        })
    }
}

#[derive(Debug, Clone, InputObject)]
pub struct ApprovalDecisionInput {
    pub action: ApprovalAction,
    /// Shown to the listing owner.
    pub message: Option<String>,
    /// Internal to admins.
    pub notes: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct SeoInput {
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub canonical_url: Option<String>,
    pub og_image: Option<String>,
}

#[derive(Debug, Clone, InputObject)]
pub struct AddImageInput {
    pub url: String,
    pub caption: Option<String>,
    pub sort_order: Option<i32>,
    pub is_primary: Option<bool>,
}

#[derive(Debug, Clone, InputObject)]
pub struct InquiryInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
}

/// SEO metadata of a listing; `is_default` marks values derived from the
/// listing because nothing is stored yet.
#[derive(Debug, Clone, PartialEq, Eq, SimpleObject)]
pub struct SeoView {
    pub property_id: Uuid,
    pub meta_title: String,
    pub meta_description: String,
    pub meta_keywords: Option<String>,
    pub canonical_url: Option<String>,
    pub og_image: Option<String>,
    pub is_default: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<property_seo::Model> for SeoView {
    fn from(seo: property_seo::Model) -> Self {
        Self {
            property_id: seo.property_id,
            meta_title: seo.meta_title,
            meta_description: seo.meta_description,
            meta_keywords: seo.meta_keywords,
            canonical_url: seo.canonical_url,
            og_image: seo.og_image,
            is_default: false,
            updated_at: Some(seo.updated_at.with_timezone(&Utc)),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn require_text(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::bad_request(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn require_positive(value: f64, field: &str) -> Result<f64, AppError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::bad_request(format!("{field} must be greater than zero")));
    }
    Ok(value)
}

fn stored_status(property: &property::Model) -> Result<ApprovalStatus, AppError> {
    ApprovalStatus::try_from(property.approval_status.as_str()).map_err(|_| {
        AppError::internal(format!(
            "property {} has unknown approval status {}",
            property.id, property.approval_status
        ))
    })
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::AlreadyInState(_) => AppError::conflict(err.to_string()),
            TransitionError::NotAllowed { .. } => AppError::bad_request(err.to_string()),
        }
    }
}

/// Listings, their approval workflow and satellite records.
#[derive(Clone)]
pub struct PropertyService {
    properties: PropertyDao,
    owners: PlatformUserDao,
    activity: ActivityLogDao,
}

impl PropertyService {
    pub fn new(properties: PropertyDao, owners: PlatformUserDao, activity: ActivityLogDao) -> Self {
        Self {
            properties,
            owners,
            activity,
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<property::Model, AppError> {
        Ok(self.properties.find_by_id(id).await?)
    }

    pub async fn list(
        &self,
        filter: PropertyFilterInput,
        page: u64,
        page_size: u64,
    ) -> Result<PaginatedResponse<property::Model>, AppError> {
        let filter = PropertyFilter::try_from(filter)?;
        Ok(self
            .properties
            .list(
                &filter,
                page,
                page_size,
                Some((property::Column::CreatedAt, Order::Desc)),
            )
            .await?)
    }

    pub async fn create(
        &self,
        actor: Uuid,
        input: CreatePropertyInput,
    ) -> Result<property::Model, AppError> {
        let title = require_text(&input.title, "title")?;
        let address = require_text(&input.address, "address")?;
        let city = require_text(&input.city, "city")?;
        let state = require_text(&input.state, "state")?;
        let price = require_positive(input.price, "price")?;
        let area = require_positive(input.area, "area")?;
        if let Some(owner_id) = input.owner_user_id {
            self.owners.find_by_id(owner_id).await?;
        }

        let created = self
            .properties
            .create(property::ActiveModel {
                title: Set(title),
                description: Set(non_blank(input.description)),
                property_type: Set(input.property_type.as_str().to_string()),
                listing_type: Set(input.listing_type.as_str().to_string()),
                price: Set(price),
                area: Set(area),
                bedrooms: Set(input.bedrooms),
                bathrooms: Set(input.bathrooms),
                address: Set(address),
                city: Set(city),
                state: Set(state),
                pincode: Set(non_blank(input.pincode)),
                status: Set(PublicationStatus::Draft.as_str().to_string()),
                approval_status: Set(ApprovalStatus::Pending.as_str().to_string()),
                is_active: Set(true),
                is_verified: Set(false),
                is_featured: Set(input.is_featured.unwrap_or(false)),
                view_count: Set(0),
                inquiry_count: Set(0),
                created_by_admin_id: Set(Some(actor)),
                owner_user_id: Set(input.owner_user_id),
                approved_by: Set(None),
                approved_at: Set(None),
                rejected_by: Set(None),
                rejected_at: Set(None),
                rejection_reason: Set(None),
                flag_reason: Set(None),
                published_at: Set(None),
                ..Default::default()
            })
            .await?;

        self.activity
            .record(NewActivity::new(Some(actor), "create_property", "property").on(created.id))
            .await?;
        Ok(created)
    }

    /// Applies the given fields; a price change appends a price-history row
    /// in the same transaction.
    pub async fn update(
        &self,
        actor: Uuid,
        id: Uuid,
        input: UpdatePropertyInput,
    ) -> Result<property::Model, AppError> {
        let current = self.properties.find_by_id(id).await?;
        if let Some(owner_id) = input.owner_user_id {
            self.owners.find_by_id(owner_id).await?;
        }

        let old_price = current.price;
        let mut active = current.into_active_model();
        if let Some(title) = input.title {
            active.title = Set(require_text(&title, "title")?);
        }
        if let Some(description) = input.description {
            active.description = Set(non_blank(Some(description)));
        }
        if let Some(property_type) = input.property_type {
            active.property_type = Set(property_type.as_str().to_string());
        }
        if let Some(listing_type) = input.listing_type {
            active.listing_type = Set(listing_type.as_str().to_string());
        }
        if let Some(area) = input.area {
            active.area = Set(require_positive(area, "area")?);
        }
        if let Some(bedrooms) = input.bedrooms {
            active.bedrooms = Set(Some(bedrooms));
        }
        if let Some(bathrooms) = input.bathrooms {
            active.bathrooms = Set(Some(bathrooms));
        }
        if let Some(address) = input.address {
            active.address = Set(require_text(&address, "address")?);
        }
        if let Some(city) = input.city {
            active.city = Set(require_text(&city, "city")?);
        }
        if let Some(state) = input.state {
            active.state = Set(require_text(&state, "state")?);
        }
        if let Some(pincode) = input.pincode {
            active.pincode = Set(non_blank(Some(pincode)));
        }
        if let Some(owner_id) = input.owner_user_id {
            active.owner_user_id = Set(Some(owner_id));
        }
        if let Some(is_featured) = input.is_featured {
            active.is_featured = Set(is_featured);
        }

        let new_price = match input.price {
            Some(price) => Some(require_positive(price, "price")?),
            None => None,
        };
        match new_price {
            Some(price) if price != old_price => {
                active.price = Set(price);
                let (updated, _) = self
                    .properties
                    .save_with_history(
                        active,
                        Condition::all().add(property::Column::Price.eq(old_price)),
                        property_price_history::ActiveModel {
                            property_id: Set(id),
                            old_price: Set(old_price),
                            new_price: Set(price),
                            changed_by: Set(Some(actor)),
                            ..Default::default()
                        },
                    )
                    .await?;
                Ok(updated)
            }
            _ => Ok(self.properties.save(active).await?),
        }
    }

    pub async fn delete(&self, actor: Uuid, id: Uuid) -> Result<Uuid, AppError> {
        self.properties.delete(id).await?;
        self.activity
            .record(NewActivity::new(Some(actor), "delete_property", "property").on(id))
            .await?;
        Ok(id)
    }

    /// Hides the listing without deleting it.
    pub async fn archive(&self, actor: Uuid, id: Uuid) -> Result<property::Model, AppError> {
        let current = self.properties.find_by_id(id).await?;
        if !current.is_active {
            return Err(AppError::conflict("property is already archived"));
        }
        let mut active = current.into_active_model();
        active.is_active = Set(false);
        let archived = self.properties.save(active).await?;
        self.activity
            .record(NewActivity::new(Some(actor), "archive_property", "property").on(id))
            .await?;
        Ok(archived)
    }

    pub async fn set_publication(
        &self,
        id: Uuid,
        status: PublicationStatus,
    ) -> Result<property::Model, AppError> {
        let current = self.properties.find_by_id(id).await?;
        if current.status == status.as_str() {
            return Err(AppError::conflict(format!(
                "property is already {}",
                status.as_str()
            )));
        }
        let mut active = current.into_active_model();
        active.status = Set(status.as_str().to_string());
        active.published_at = Set(match status {
            PublicationStatus::Published => Some(Utc::now().fixed_offset()),
            PublicationStatus::Draft => None,
        });
        Ok(self.properties.save(active).await?)
    }

    /// Moves the listing through the approval workflow and appends the
    /// decision to its history atomically.
    pub async fn transition(
        &self,
        actor: Uuid,
        id: Uuid,
        decision: ApprovalDecisionInput,
    ) -> Result<(property::Model, approval_action::Model), AppError> {
        let reason = non_blank(decision.reason);
        if decision.action.requires_reason() && reason.is_none() {
            return Err(AppError::bad_request(format!(
                "A reason is required to {} a property",
                decision.action.as_str()
            )));
        }

        let current = self.properties.find_by_id(id).await?;
        let previous = stored_status(&current)?;
        let next = next_status(previous, decision.action)?;
        let now = Utc::now().fixed_offset();

        let mut active = current.into_active_model();
        active.approval_status = Set(next.as_str().to_string());
        match decision.action {
            ApprovalAction::Approve => {
                active.approved_by = Set(Some(actor));
                active.approved_at = Set(Some(now));
                active.flag_reason = Set(None);
            }
            ApprovalAction::Reject => {
                active.rejected_by = Set(Some(actor));
                active.rejected_at = Set(Some(now));
                active.rejection_reason = Set(reason.clone());
            }
            ApprovalAction::Flag => {
                active.flag_reason = Set(reason.clone());
            }
            ApprovalAction::Reopen => {
                active.flag_reason = Set(None);
            }
        }

        let (property, action) = self
            .properties
            .save_with_history(
                active,
                Condition::all().add(property::Column::ApprovalStatus.eq(previous.as_str())),
                approval_action::ActiveModel {
                    property_id: Set(id),
                    action: Set(decision.action.as_str().to_string()),
                    previous_status: Set(previous.as_str().to_string()),
                    new_status: Set(next.as_str().to_string()),
                    performed_by: Set(Some(actor)),
                    message: Set(non_blank(decision.message)),
                    notes: Set(non_blank(decision.notes)),
                    reason: Set(reason),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(
            property_id = %id,
            from = previous.as_str(),
            to = next.as_str(),
            admin_id = %actor,
            "approval status changed"
        );
        Ok((property, action))
    }

    pub async fn set_verification(
        &self,
        actor: Uuid,
        id: Uuid,
        is_verified: bool,
        notes: Option<String>,
    ) -> Result<property::Model, AppError> {
        let current = self.properties.find_by_id(id).await?;
        if current.is_verified == is_verified {
            return Err(AppError::conflict(if is_verified {
                "property is already verified"
            } else {
                "property is already unverified"
            }));
        }

        let mut active = current.into_active_model();
        active.is_verified = Set(is_verified);
        let (property, _) = self
            .properties
            .save_with_history(
                active,
                Condition::all().add(property::Column::IsVerified.eq(!is_verified)),
                property_verification::ActiveModel {
                    property_id: Set(id),
                    is_verified: Set(is_verified),
                    verified_by: Set(Some(actor)),
                    notes: Set(non_blank(notes)),
                    ..Default::default()
                },
            )
            .await?;
        Ok(property)
    }

    pub async fn approval_history(
        &self,
        id: Uuid,
    ) -> Result<Vec<approval_action::Model>, AppError> {
        Ok(self.properties.approval_history(id).await?)
    }

    pub async fn price_history(
        &self,
        id: Uuid,
    ) -> Result<Vec<property_price_history::Model>, AppError> {
        Ok(self.properties.price_history(id).await?)
    }

    pub async fn verification_history(
        &self,
        id: Uuid,
    ) -> Result<Vec<property_verification::Model>, AppError> {
        Ok(self.properties.verification_history(id).await?)
    }

    pub async fn seo(&self, id: Uuid) -> Result<SeoView, AppError> {
        if let Some(stored) = self.properties.find_seo(id).await? {
            return Ok(stored.into());
        }

        let property = self.properties.find_by_id(id).await?;
        let defaults = default_seo(
            &property.title,
            property.description.as_deref(),
            &property.property_type,
            &property.listing_type,
            &property.city,
        );
        Ok(SeoView {
            property_id: id,
            meta_title: defaults.meta_title,
            meta_description: defaults.meta_description,
            meta_keywords: Some(defaults.meta_keywords),
            canonical_url: None,
            og_image: None,
            is_default: true,
            updated_at: None,
        })
    }

    /// Stores SEO metadata; omitted title/description fall back to the
    /// derived defaults.
    pub async fn upsert_seo(
        &self,
        actor: Uuid,
        id: Uuid,
        input: SeoInput,
    ) -> Result<SeoView, AppError> {
        let property = self.properties.find_by_id(id).await?;
        let defaults = default_seo(
            &property.title,
            property.description.as_deref(),
            &property.property_type,
            &property.listing_type,
            &property.city,
        );

        let meta_title = non_blank(input.meta_title).unwrap_or(defaults.meta_title);
        let meta_description =
            non_blank(input.meta_description).unwrap_or(defaults.meta_description);
        if meta_title.chars().count() > SEO_TITLE_MAX {
            return Err(AppError::bad_request(format!(
                "metaTitle must be at most {SEO_TITLE_MAX} characters"
            )));
        }
        if meta_description.chars().count() > SEO_DESCRIPTION_MAX {
            return Err(AppError::bad_request(format!(
                "metaDescription must be at most {SEO_DESCRIPTION_MAX} characters"
            )));
        }

        let stored = self
            .properties
            .upsert_seo(
                property_seo::ActiveModel {
                    meta_title: Set(meta_title),
                    meta_description: Set(meta_description),
                    meta_keywords: Set(non_blank(input.meta_keywords)),
                    canonical_url: Set(non_blank(input.canonical_url)),
                    og_image: Set(non_blank(input.og_image)),
                    updated_by: Set(Some(actor)),
                    ..Default::default()
                },
                id,
            )
            .await?;
        Ok(stored.into())
    }

    pub async fn images(&self, id: Uuid) -> Result<Vec<property_image::Model>, AppError> {
        Ok(self.properties.images(id).await?)
    }

    pub async fn add_image(
        &self,
        id: Uuid,
        input: AddImageInput,
    ) -> Result<property_image::Model, AppError> {
        let url = require_text(&input.url, "url")?;
        self.properties.find_by_id(id).await?;
        Ok(self
            .properties
            .add_image(
                property_image::ActiveModel {
                    url: Set(url),
                    caption: Set(non_blank(input.caption)),
                    sort_order: Set(input.sort_order.unwrap_or(0)),
                    ..Default::default()
                },
                id,
                input.is_primary.unwrap_or(false),
            )
            .await?)
    }

    pub async fn remove_image(&self, image_id: Uuid) -> Result<Uuid, AppError> {
        Ok(self.properties.remove_image(image_id).await?)
    }

    pub async fn record_view(
        &self,
        id: Uuid,
        viewer_id: Option<Uuid>,
    ) -> Result<property_view::Model, AppError> {
        Ok(self.properties.record_view(id, viewer_id).await?)
    }

    pub async fn submit_inquiry(
        &self,
        id: Uuid,
        input: InquiryInput,
    ) -> Result<property_inquiry::Model, AppError> {
        let name = require_text(&input.name, "name")?;
        let message = require_text(&input.message, "message")?;
        let email = input.email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(AppError::bad_request("A valid email address is required"));
        }

        let inquiry = self
            .properties
            .submit_inquiry(
                property_inquiry::ActiveModel {
                    name: Set(name),
                    email: Set(email),
                    phone: Set(non_blank(input.phone)),
                    message: Set(message),
                    status: Set(InquiryStatus::New.as_str().to_string()),
                    ..Default::default()
                },
                id,
            )
            .await?;
        tracing::debug!(property_id = %id, inquiry_id = %inquiry.id, "inquiry received");
        Ok(inquiry)
    }

    pub async fn inquiries(&self, id: Uuid) -> Result<Vec<property_inquiry::Model>, AppError> {
        Ok(self.properties.inquiries(id).await?)
    }

    pub async fn record_audit(&self, actor: Uuid, action: &str, id: Uuid) -> Result<(), AppError> {
        self.activity
            .record(
                NewActivity::new(Some(actor), action, "property")
                    .on(id)
                    .with_details(json!({ "property_id": id })),
            )
            .await?;
        Ok(())
    }
}
