use async_graphql::{ComplexObject, Context, Json, OutputType, SimpleObject};
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

use crate::{
    auth::{TokenBundle, catalog},
    db::{
        dao::PaginatedResponse,
        entities::{
            activity_log, admin_user, admin_user_role, approval_action, permission,
            platform_user, property, property_image, property_inquiry, property_price_history,
            property_verification, property_view, role,
        },
    },
    graphql::{
        context::request,
        error::{GqlResult, IntoGql},
    },
    services::property_service::SeoView,
};

fn utc(at: DateTimeWithTimeZone) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(concrete(name = "AdminUserPage", params(AdminUser)))]
#[graphql(concrete(name = "PlatformUserPage", params(PlatformUser)))]
#[graphql(concrete(name = "PropertyPage", params(Property)))]
#[graphql(concrete(name = "ActivityLogPage", params(ActivityEntry)))]
pub struct Page<T: OutputType> {
    pub items: Vec<T>,
    pub page: u64,
    pub page_size: u64,
    pub has_next: bool,
}

impl<T: OutputType> Page<T> {
    pub fn from_models<M>(page: PaginatedResponse<M>) -> Self
    where
        T: From<M>,
    {
        let page = page.map(T::from);
        Self {
            items: page.data,
            page: page.page,
            page_size: page.page_size,
            has_next: page.has_next,
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
pub struct AuthPayload {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access-token lifetime in seconds.
    pub expires_in: i64,
    pub admin_id: Uuid,
    pub session_id: Uuid,
}

impl From<TokenBundle> for AuthPayload {
    fn from(bundle: TokenBundle) -> Self {
        Self {
            access_token: bundle.access_token,
            refresh_token: bundle.refresh_token,
            token_type: bundle.token_type.to_string(),
            expires_in: bundle.expires_in,
            admin_id: bundle.admin_id,
            session_id: bundle.session_id,
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(complex)]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<admin_user::Model> for AdminUser {
    fn from(admin: admin_user::Model) -> Self {
        Self {
            id: admin.id,
            email: admin.email,
            first_name: admin.first_name,
            last_name: admin.last_name,
            phone: admin.phone,
            is_active: admin.is_active,
            is_verified: admin.is_verified,
            last_login_at: admin.last_login_at.map(utc),
            created_at: utc(admin.created_at),
            updated_at: utc(admin.updated_at),
        }
    }
}

#[ComplexObject]
impl AdminUser {
    /// Role slugs currently held; expired assignments are left out.
    async fn roles(&self, ctx: &Context<'_>) -> GqlResult<Vec<String>> {
        request(ctx)?.services().admin().roles_of(self.id).await.gql()
    }
}

/// The signed-in admin together with what they may do.
#[derive(Debug, Clone, SimpleObject)]
pub struct Viewer {
    pub admin: AdminUser,
    pub session_id: Uuid,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(complex)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_system_role: bool,
    pub created_at: DateTime<Utc>,
}

impl From<role::Model> for Role {
    fn from(role: role::Model) -> Self {
        Self {
            id: role.id,
            name: role.name,
            slug: role.slug,
            description: role.description,
            is_system_role: role.is_system_role,
            created_at: utc(role.created_at),
        }
    }
}

#[ComplexObject]
impl Role {
    async fn permissions(&self, ctx: &Context<'_>) -> GqlResult<Vec<Permission>> {
        let permissions = request(ctx)?
            .services()
            .role()
            .permissions_of(self.id)
            .await
            .gql()?;
        Ok(permissions.into_iter().map(Permission::from).collect())
    }
}

#[derive(Debug, Clone, SimpleObject)]
pub struct Permission {
    pub id: Uuid,
    pub resource: String,
    pub action: String,
    /// `resource:action`.
    pub name: String,
    pub description: Option<String>,
}

impl From<permission::Model> for Permission {
    fn from(permission: permission::Model) -> Self {
        Self {
            id: permission.id,
            resource: permission.resource,
            action: permission.action,
            name: permission.name,
            description: permission.description,
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
pub struct RoleAssignment {
    pub id: Uuid,
    pub admin_user_id: Uuid,
    pub role_id: Uuid,
    pub granted_by: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<admin_user_role::Model> for RoleAssignment {
    fn from(assignment: admin_user_role::Model) -> Self {
        Self {
            id: assignment.id,
            admin_user_id: assignment.admin_user_id,
            role_id: assignment.role_id,
            granted_by: assignment.granted_by,
            expires_at: assignment.expires_at.map(utc),
            created_at: utc(assignment.created_at),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub admin_user_id: Option<Uuid>,
    pub action: String,
    pub resource: String,
    pub resource_id: Option<Uuid>,
    pub success: bool,
    pub details: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
}

impl From<activity_log::Model> for ActivityEntry {
    fn from(entry: activity_log::Model) -> Self {
        Self {
            id: entry.id,
            admin_user_id: entry.admin_user_id,
            action: entry.action,
            resource: entry.resource,
            resource_id: entry.resource_id,
            success: entry.success,
            details: entry.details.map(Json),
            created_at: utc(entry.created_at),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
pub struct PlatformUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub user_type: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<platform_user::Model> for PlatformUser {
    fn from(user: platform_user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            user_type: user.user_type,
            is_active: user.is_active,
            created_at: utc(user.created_at),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(complex)]
pub struct Property {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub property_type: String,
    pub listing_type: String,
    pub price: f64,
    pub area: f64,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: Option<String>,
    /// `DRAFT` or `PUBLISHED`.
    pub status: String,
    pub approval_status: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_featured: bool,
    pub view_count: i64,
    pub inquiry_count: i64,
    pub created_by_admin_id: Option<Uuid>,
    pub owner_user_id: Option<Uuid>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub flag_reason: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<property::Model> for Property {
    fn from(p: property::Model) -> Self {
        Self {
            id: p.id,
            title: p.title,
            description: p.description,
            property_type: p.property_type,
            listing_type: p.listing_type,
            price: p.price,
            area: p.area,
            bedrooms: p.bedrooms,
            bathrooms: p.bathrooms,
            address: p.address,
            city: p.city,
            state: p.state,
            pincode: p.pincode,
            status: p.status,
            approval_status: p.approval_status,
            is_active: p.is_active,
            is_verified: p.is_verified,
            is_featured: p.is_featured,
            view_count: p.view_count,
            inquiry_count: p.inquiry_count,
            created_by_admin_id: p.created_by_admin_id,
            owner_user_id: p.owner_user_id,
            approved_by: p.approved_by,
            approved_at: p.approved_at.map(utc),
            rejected_by: p.rejected_by,
            rejected_at: p.rejected_at.map(utc),
            rejection_reason: p.rejection_reason,
            flag_reason: p.flag_reason,
            published_at: p.published_at.map(utc),
            created_at: utc(p.created_at),
            updated_at: utc(p.updated_at),
        }
    }
}

#[ComplexObject]
impl Property {
    async fn images(&self, ctx: &Context<'_>) -> GqlResult<Vec<PropertyImage>> {
        let images = request(ctx)?.services().property().images(self.id).await.gql()?;
        Ok(images.into_iter().map(PropertyImage::from).collect())
    }

    /// Stored metadata, or defaults derived from the listing.
    async fn seo(&self, ctx: &Context<'_>) -> GqlResult<SeoView> {
        request(ctx)?.services().property().seo(self.id).await.gql()
    }

    async fn approval_history(&self, ctx: &Context<'_>) -> GqlResult<Vec<ApprovalRecord>> {
        let history = request(ctx)?
            .services()
            .property()
            .approval_history(self.id)
            .await
            .gql()?;
        Ok(history.into_iter().map(ApprovalRecord::from).collect())
    }

    async fn price_history(&self, ctx: &Context<'_>) -> GqlResult<Vec<PriceChange>> {
        let history = request(ctx)?
            .services()
            .property()
            .price_history(self.id)
            .await
            .gql()?;
        Ok(history.into_iter().map(PriceChange::from).collect())
    }

    async fn verification_history(
        &self,
        ctx: &Context<'_>,
    ) -> GqlResult<Vec<VerificationRecord>> {
        let history = request(ctx)?
            .services()
            .property()
            .verification_history(self.id)
            .await
            .gql()?;
        Ok(history.into_iter().map(VerificationRecord::from).collect())
    }

    /// Buyer contact details; needs `properties:view`.
    async fn inquiries(&self, ctx: &Context<'_>) -> GqlResult<Vec<Inquiry>> {
        let rc = request(ctx)?;
        rc.require(catalog::PROPERTIES_VIEW).await.gql()?;
        let inquiries = rc.services().property().inquiries(self.id).await.gql()?;
        Ok(inquiries.into_iter().map(Inquiry::from).collect())
    }
}

#[derive(Debug, Clone, SimpleObject)]
pub struct ApprovalRecord {
    pub id: Uuid,
    pub property_id: Uuid,
    pub action: String,
    pub previous_status: String,
    pub new_status: String,
    pub performed_by: Option<Uuid>,
    pub message: Option<String>,
    pub notes: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<approval_action::Model> for ApprovalRecord {
    fn from(action: approval_action::Model) -> Self {
        Self {
            id: action.id,
            property_id: action.property_id,
            action: action.action,
            previous_status: action.previous_status,
            new_status: action.new_status,
            performed_by: action.performed_by,
            message: action.message,
            notes: action.notes,
            reason: action.reason,
            created_at: utc(action.created_at),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
pub struct ApprovalOutcome {
    pub property: Property,
    pub record: ApprovalRecord,
}

#[derive(Debug, Clone, SimpleObject)]
pub struct PriceChange {
    pub id: Uuid,
    pub old_price: f64,
    pub new_price: f64,
    pub changed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<property_price_history::Model> for PriceChange {
    fn from(change: property_price_history::Model) -> Self {
        Self {
            id: change.id,
            old_price: change.old_price,
            new_price: change.new_price,
            changed_by: change.changed_by,
            created_at: utc(change.created_at),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
pub struct VerificationRecord {
    pub id: Uuid,
    pub is_verified: bool,
    pub verified_by: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<property_verification::Model> for VerificationRecord {
    fn from(record: property_verification::Model) -> Self {
        Self {
            id: record.id,
            is_verified: record.is_verified,
            verified_by: record.verified_by,
            notes: record.notes,
            created_at: utc(record.created_at),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
pub struct PropertyImage {
    pub id: Uuid,
    pub property_id: Uuid,
    pub url: String,
    pub caption: Option<String>,
    pub sort_order: i32,
    pub is_primary: bool,
}

impl From<property_image::Model> for PropertyImage {
    fn from(image: property_image::Model) -> Self {
        Self {
            id: image.id,
            property_id: image.property_id,
            url: image.url,
            caption: image.caption,
            sort_order: image.sort_order,
            is_primary: image.is_primary,
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
pub struct Inquiry {
    pub id: Uuid,
    pub property_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<property_inquiry::Model> for Inquiry {
    fn from(inquiry: property_inquiry::Model) -> Self {
        Self {
            id: inquiry.id,
            property_id: inquiry.property_id,
            name: inquiry.name,
            email: inquiry.email,
            phone: inquiry.phone,
            message: inquiry.message,
            status: inquiry.status,
            created_at: utc(inquiry.created_at),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
pub struct PropertyView {
    pub id: Uuid,
    pub property_id: Uuid,
    pub viewer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<property_view::Model> for PropertyView {
    fn from(view: property_view::Model) -> Self {
        Self {
            id: view.id,
            property_id: view.property_id,
            viewer_id: view.viewer_id,
            created_at: utc(view.created_at),
        }
    }
}
