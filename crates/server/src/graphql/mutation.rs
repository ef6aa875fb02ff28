use async_graphql::{Context, Object};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    auth::catalog,
    domain::property::{ApprovalAction, PublicationStatus},
    graphql::{
        context::{RequestContext, request},
        error::{GqlResult, IntoGql},
        types::{
            AdminUser, ApprovalOutcome, AuthPayload, Inquiry, Permission, PlatformUser, Property,
            PropertyImage, PropertyView, Role, RoleAssignment,
        },
    },
    services::{
        admin_service::{CreateAdminInput, UpdateAdminInput},
        property_service::{
            AddImageInput, ApprovalDecisionInput, CreatePropertyInput, InquiryInput, SeoInput,
            SeoView, UpdatePropertyInput,
        },
        role_service::{CreateRoleInput, UpdateRoleInput},
    },
};

async fn decide(
    rc: &RequestContext,
    id: Uuid,
    decision: ApprovalDecisionInput,
) -> GqlResult<ApprovalOutcome> {
    let admin = rc.require(catalog::PROPERTIES_APPROVE).await.gql()?;
    let (property, record) = rc
        .services()
        .property()
        .transition(admin.id, id, decision)
        .await
        .gql()?;
    Ok(ApprovalOutcome {
        property: property.into(),
        record: record.into(),
    })
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> GqlResult<AuthPayload> {
        let rc = request(ctx)?;
        let tokens = rc
            .services()
            .auth(&rc.state().auth_providers)
            .login(&email, &password, rc.user_agent())
            .await
            .gql()?;
        Ok(tokens.into())
    }

    /// Exchanges a refresh token for a new pair; the old refresh token stops
    /// working.
    async fn refresh_token(
        &self,
        ctx: &Context<'_>,
        refresh_token: String,
    ) -> GqlResult<AuthPayload> {
        let rc = request(ctx)?;
        let tokens = rc
            .services()
            .auth(&rc.state().auth_providers)
            .refresh(&refresh_token)
            .await
            .gql()?;
        Ok(tokens.into())
    }

    async fn logout(&self, ctx: &Context<'_>, all_sessions: Option<bool>) -> GqlResult<bool> {
        let rc = request(ctx)?;
        let admin = rc.admin().gql()?;
        let auth = rc.services().auth(&rc.state().auth_providers);
        let everywhere = all_sessions.unwrap_or(false);
        if everywhere {
            auth.logout_all(admin.id).await.gql()?;
        } else if let Some(token) = rc.bearer() {
            auth.logout(token).await.gql()?;
        }
        rc.services()
            .admin()
            .record_logout(admin.id, everywhere)
            .await
            .gql()?;
        Ok(true)
    }

    /// Always succeeds for well-formed addresses, whether or not an account
    /// exists.
    async fn request_password_reset(&self, ctx: &Context<'_>, email: String) -> GqlResult<bool> {
        let rc = request(ctx)?;
        let state = rc.state();
        rc.services()
            .otp(state.messenger.clone(), &state.config.otp)
            .request_password_reset(&email)
            .await
            .gql()?;
        Ok(true)
    }

    async fn reset_password(
        &self,
        ctx: &Context<'_>,
        email: String,
        code: String,
        new_password: String,
    ) -> GqlResult<bool> {
        let rc = request(ctx)?;
        let state = rc.state();
        rc.services()
            .otp(state.messenger.clone(), &state.config.otp)
            .reset_password(&email, &code, &new_password)
            .await
            .gql()?;
        Ok(true)
    }

    async fn create_admin(
        &self,
        ctx: &Context<'_>,
        input: CreateAdminInput,
    ) -> GqlResult<AdminUser> {
        let rc = request(ctx)?;
        let actor = rc.require(catalog::ADMINS_MANAGE).await.gql()?;
        Ok(rc.services().admin().create(actor.id, input).await.gql()?.into())
    }

    async fn update_admin(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: UpdateAdminInput,
    ) -> GqlResult<AdminUser> {
        let rc = request(ctx)?;
        let caller = rc.admin().gql()?;
        if caller.id != id {
            rc.require(catalog::ADMINS_MANAGE).await.gql()?;
        }
        Ok(rc
            .services()
            .admin()
            .update(caller.id, id, input)
            .await
            .gql()?
            .into())
    }

    async fn set_admin_active(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        is_active: bool,
    ) -> GqlResult<AdminUser> {
        let rc = request(ctx)?;
        let actor = rc.require(catalog::ADMINS_MANAGE).await.gql()?;
        Ok(rc
            .services()
            .admin()
            .set_active(actor.id, id, is_active)
            .await
            .gql()?
            .into())
    }

    async fn create_role(&self, ctx: &Context<'_>, input: CreateRoleInput) -> GqlResult<Role> {
        let rc = request(ctx)?;
        let actor = rc.require(catalog::ROLES_MANAGE).await.gql()?;
        Ok(rc.services().role().create_role(actor.id, input).await.gql()?.into())
    }

    async fn update_role(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: UpdateRoleInput,
    ) -> GqlResult<Role> {
        let rc = request(ctx)?;
        let actor = rc.require(catalog::ROLES_MANAGE).await.gql()?;
        Ok(rc
            .services()
            .role()
            .update_role(actor.id, id, input)
            .await
            .gql()?
            .into())
    }

    async fn delete_role(&self, ctx: &Context<'_>, id: Uuid) -> GqlResult<Uuid> {
        let rc = request(ctx)?;
        let actor = rc.require(catalog::ROLES_MANAGE).await.gql()?;
        rc.services().role().delete_role(actor.id, id).await.gql()
    }

    /// Replaces the role's grants with exactly `permissions`.
    async fn set_role_permissions(
        &self,
        ctx: &Context<'_>,
        role_id: Uuid,
        permissions: Vec<String>,
    ) -> GqlResult<Vec<Permission>> {
        let rc = request(ctx)?;
        let actor = rc.require(catalog::ROLES_MANAGE).await.gql()?;
        let granted = rc
            .services()
            .role()
            .set_permissions(actor.id, role_id, permissions)
            .await
            .gql()?;
        Ok(granted.into_iter().map(Permission::from).collect())
    }

    async fn create_permission(
        &self,
        ctx: &Context<'_>,
        resource: String,
        action: String,
        description: Option<String>,
    ) -> GqlResult<Permission> {
        let rc = request(ctx)?;
        let actor = rc.require(catalog::ROLES_MANAGE).await.gql()?;
        Ok(rc
            .services()
            .role()
            .create_permission(actor.id, &resource, &action, description)
            .await
            .gql()?
            .into())
    }

    async fn assign_role(
        &self,
        ctx: &Context<'_>,
        admin_id: Uuid,
        role_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> GqlResult<RoleAssignment> {
        let rc = request(ctx)?;
        let actor = rc.require(catalog::ROLES_MANAGE).await.gql()?;
        Ok(rc
            .services()
            .role()
            .assign_role(actor.id, admin_id, role_id, expires_at)
            .await
            .gql()?
            .into())
    }

    async fn remove_role(
        &self,
        ctx: &Context<'_>,
        admin_id: Uuid,
        role_id: Uuid,
    ) -> GqlResult<bool> {
        let rc = request(ctx)?;
        let actor = rc.require(catalog::ROLES_MANAGE).await.gql()?;
        rc.services()
            .role()
            .remove_role(actor.id, admin_id, role_id)
            .await
            .gql()?;
        Ok(true)
    }

    async fn set_user_active(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        is_active: bool,
    ) -> GqlResult<PlatformUser> {
        let rc = request(ctx)?;
        let actor = rc.require(catalog::USERS_MANAGE).await.gql()?;
        Ok(rc
            .services()
            .user()
            .set_active(actor.id, id, is_active)
            .await
            .gql()?
            .into())
    }

    async fn create_property(
        &self,
        ctx: &Context<'_>,
        input: CreatePropertyInput,
    ) -> GqlResult<Property> {
        let rc = request(ctx)?;
        let actor = rc.require(catalog::PROPERTIES_CREATE).await.gql()?;
        Ok(rc.services().property().create(actor.id, input).await.gql()?.into())
    }

    async fn update_property(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: UpdatePropertyInput,
    ) -> GqlResult<Property> {
        let rc = request(ctx)?;
        let actor = rc.require(catalog::PROPERTIES_UPDATE).await.gql()?;
        Ok(rc
            .services()
            .property()
            .update(actor.id, id, input)
            .await
            .gql()?
            .into())
    }

    async fn delete_property(&self, ctx: &Context<'_>, id: Uuid) -> GqlResult<Uuid> {
        let rc = request(ctx)?;
        let actor = rc.require(catalog::PROPERTIES_DELETE).await.gql()?;
        rc.services().property().delete(actor.id, id).await.gql()
    }

    async fn archive_property(&self, ctx: &Context<'_>, id: Uuid) -> GqlResult<Property> {
        let rc = request(ctx)?;
        let actor = rc.require(catalog::PROPERTIES_UPDATE).await.gql()?;
        Ok(rc.services().property().archive(actor.id, id).await.gql()?.into())
    }

    async fn publish_property(&self, ctx: &Context<'_>, id: Uuid) -> GqlResult<Property> {
        let rc = request(ctx)?;
        let actor = rc.require(catalog::PROPERTIES_UPDATE).await.gql()?;
        let service = rc.services().property();
        let property = service
            .set_publication(id, PublicationStatus::Published)
            .await
            .gql()?;
        service.record_audit(actor.id, "publish_property", id).await.gql()?;
        Ok(property.into())
    }

    async fn unpublish_property(&self, ctx: &Context<'_>, id: Uuid) -> GqlResult<Property> {
        let rc = request(ctx)?;
        let actor = rc.require(catalog::PROPERTIES_UPDATE).await.gql()?;
        let service = rc.services().property();
        let property = service
            .set_publication(id, PublicationStatus::Draft)
            .await
            .gql()?;
        service.record_audit(actor.id, "unpublish_property", id).await.gql()?;
        Ok(property.into())
    }

    /// Applies any approval action; see the dedicated mutations for the
    /// common cases.
    async fn transition_property(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: ApprovalDecisionInput,
    ) -> GqlResult<ApprovalOutcome> {
        decide(request(ctx)?, id, input).await
    }

    async fn approve_property(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        message: Option<String>,
        notes: Option<String>,
    ) -> GqlResult<ApprovalOutcome> {
        let decision = ApprovalDecisionInput {
            action: ApprovalAction::Approve,
            message,
            notes,
            reason: None,
        };
        decide(request(ctx)?, id, decision).await
    }

    async fn reject_property(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        reason: String,
        message: Option<String>,
        notes: Option<String>,
    ) -> GqlResult<ApprovalOutcome> {
        let decision = ApprovalDecisionInput {
            action: ApprovalAction::Reject,
            message,
            notes,
            reason: Some(reason),
        };
        decide(request(ctx)?, id, decision).await
    }

    async fn flag_property(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        reason: Option<String>,
        notes: Option<String>,
    ) -> GqlResult<ApprovalOutcome> {
        let decision = ApprovalDecisionInput {
            action: ApprovalAction::Flag,
            message: None,
            notes,
            reason,
        };
        decide(request(ctx)?, id, decision).await
    }

    async fn reopen_property(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        notes: Option<String>,
    ) -> GqlResult<ApprovalOutcome> {
        let decision = ApprovalDecisionInput {
            action: ApprovalAction::Reopen,
            message: None,
            notes,
            reason: None,
        };
        decide(request(ctx)?, id, decision).await
    }

    async fn set_property_verification(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        is_verified: bool,
        notes: Option<String>,
    ) -> GqlResult<Property> {
        let rc = request(ctx)?;
        let actor = rc.require(catalog::PROPERTIES_VERIFY).await.gql()?;
        Ok(rc
            .services()
            .property()
            .set_verification(actor.id, id, is_verified, notes)
            .await
            .gql()?
            .into())
    }

    async fn upsert_property_seo(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: SeoInput,
    ) -> GqlResult<SeoView> {
        let rc = request(ctx)?;
        let actor = rc.require(catalog::SEO_MANAGE).await.gql()?;
        rc.services()
            .property()
            .upsert_seo(actor.id, id, input)
            .await
            .gql()
    }

    async fn add_property_image(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: AddImageInput,
    ) -> GqlResult<PropertyImage> {
        let rc = request(ctx)?;
        rc.require(catalog::PROPERTIES_UPDATE).await.gql()?;
        Ok(rc.services().property().add_image(id, input).await.gql()?.into())
    }

    async fn remove_property_image(&self, ctx: &Context<'_>, image_id: Uuid) -> GqlResult<Uuid> {
        let rc = request(ctx)?;
        rc.require(catalog::PROPERTIES_UPDATE).await.gql()?;
        rc.services().property().remove_image(image_id).await.gql()
    }

    /// Public counter; anonymous callers are recorded without a viewer.
    async fn record_property_view(&self, ctx: &Context<'_>, id: Uuid) -> GqlResult<PropertyView> {
        let rc = request(ctx)?;
        let viewer = rc.identity().admin().map(|admin| admin.id);
        Ok(rc
            .services()
            .property()
            .record_view(id, viewer)
            .await
            .gql()?
            .into())
    }

    async fn submit_inquiry(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: InquiryInput,
    ) -> GqlResult<Inquiry> {
        let rc = request(ctx)?;
        Ok(rc
            .services()
            .property()
            .submit_inquiry(id, input)
            .await
            .gql()?
            .into())
    }
}
