//! Row fixtures and app builders shared by unit and router tests.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::Router;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use sea_orm::{DatabaseConnection, Value};
use uuid::Uuid;

use crate::{
    auth::{
        bootstrap::build_providers,
        jwt::{JwtKeys, encode_token, make_access_claims},
    },
    config::{AppConfig, AuthConfig},
    db::{
        dao::DaoContext,
        entities::{
            activity_log, admin_session, admin_user, admin_user_role, approval_action, otp_code,
            permission, platform_user, property, property_image, property_inquiry, property_seo,
            refresh_token, role, role_permission,
        },
    },
    error::AppError,
    routes::router,
    services::notification::{MessageSender, OutboundMessage},
    state::AppState,
};

pub const TEST_JWT_SECRET: &str = "router-test-secret";

pub fn ts() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .expect("offset should be valid")
        .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
        .single()
        .expect("timestamp should be valid")
}

fn far_future() -> DateTime<FixedOffset> {
    (Utc::now() + chrono::Duration::days(7)).fixed_offset()
}

pub fn admin_model(email: &str, is_active: bool) -> admin_user::Model {
    admin_user::Model {
        id: Uuid::new_v4(),
        created_at: ts(),
        updated_at: ts(),
        email: email.to_string(),
        password_hash: "not-a-real-hash".to_string(),
        first_name: "Alice".to_string(),
        last_name: "Admin".to_string(),
        phone: None,
        is_active,
        is_verified: true,
        last_login_at: None,
    }
}

pub fn role_model(name: &str, slug: &str, is_system_role: bool) -> role::Model {
    role::Model {
        id: Uuid::new_v4(),
        created_at: ts(),
        updated_at: ts(),
        name: name.to_string(),
        slug: slug.to_string(),
        description: None,
        is_system_role,
    }
}

pub fn permission_model(resource: &str, action: &str) -> permission::Model {
    permission::Model {
        id: Uuid::new_v4(),
        created_at: ts(),
        updated_at: ts(),
        resource: resource.to_string(),
        action: action.to_string(),
        name: format!("{resource}:{action}"),
        description: None,
    }
}

pub fn grant_model(role_id: Uuid, permission_id: Uuid) -> role_permission::Model {
    role_permission::Model {
        id: Uuid::new_v4(),
        created_at: ts(),
        role_id,
        permission_id,
    }
}

pub fn assignment_model(
    admin_user_id: Uuid,
    role_id: Uuid,
    expires_at: Option<DateTime<FixedOffset>>,
) -> admin_user_role::Model {
    admin_user_role::Model {
        id: Uuid::new_v4(),
        created_at: ts(),
        updated_at: ts(),
        admin_user_id,
        role_id,
        granted_by: None,
        expires_at,
    }
}

pub fn session_model(admin_user_id: Uuid, is_active: bool) -> admin_session::Model {
    admin_session::Model {
        id: Uuid::new_v4(),
        created_at: ts(),
        updated_at: ts(),
        admin_user_id,
        expires_at: far_future(),
        is_active,
        last_seen_at: None,
        user_agent: None,
    }
}

pub fn refresh_token_model(
    admin_user_id: Uuid,
    session_id: Uuid,
    token_hash: &str,
    is_active: bool,
) -> refresh_token::Model {
    refresh_token::Model {
        id: Uuid::new_v4(),
        created_at: ts(),
        updated_at: ts(),
        admin_user_id,
        session_id,
        token_hash: token_hash.to_string(),
        expires_at: far_future(),
        is_active,
        last_used_at: None,
    }
}

pub fn activity_model(
    admin_user_id: Option<Uuid>,
    action: &str,
    success: bool,
) -> activity_log::Model {
    activity_log::Model {
        id: Uuid::new_v4(),
        created_at: ts(),
        admin_user_id,
        action: action.to_string(),
        resource: "admin_user".to_string(),
        resource_id: None,
        success,
        details: None,
    }
}

pub fn property_model(title: &str, approval_status: &str) -> property::Model {
    property::Model {
        id: Uuid::new_v4(),
        created_at: ts(),
        updated_at: ts(),
        title: title.to_string(),
        description: Some("Three bedroom home close to the lake".to_string()),
        property_type: "HOUSE".to_string(),
        listing_type: "SALE".to_string(),
        price: 4_500_000.0,
        area: 1800.0,
        bedrooms: Some(3),
        bathrooms: Some(2),
        address: "12 Lake Road".to_string(),
        city: "Pune".to_string(),
        state: "Maharashtra".to_string(),
        pincode: Some("411001".to_string()),
        status: "DRAFT".to_string(),
        approval_status: approval_status.to_string(),
        is_active: true,
        is_verified: false,
        is_featured: false,
        view_count: 0,
        inquiry_count: 0,
        created_by_admin_id: None,
        owner_user_id: None,
        approved_by: None,
        approved_at: None,
        rejected_by: None,
        rejected_at: None,
        rejection_reason: None,
        flag_reason: None,
        published_at: None,
    }
}

pub fn approval_model(
    property_id: Uuid,
    previous_status: &str,
    new_status: &str,
    performed_by: Option<Uuid>,
) -> approval_action::Model {
    approval_action::Model {
        id: Uuid::new_v4(),
        created_at: ts(),
        property_id,
        action: "approve".to_string(),
        previous_status: previous_status.to_string(),
        new_status: new_status.to_string(),
        performed_by,
        message: None,
        notes: None,
        reason: None,
    }
}

pub fn seo_model(property_id: Uuid, meta_title: &str) -> property_seo::Model {
    property_seo::Model {
        id: Uuid::new_v4(),
        created_at: ts(),
        updated_at: ts(),
        property_id,
        meta_title: meta_title.to_string(),
        meta_description: "Stored description".to_string(),
        meta_keywords: None,
        canonical_url: None,
        og_image: None,
        updated_by: None,
    }
}

pub fn image_model(property_id: Uuid, is_primary: bool) -> property_image::Model {
    property_image::Model {
        id: Uuid::new_v4(),
        created_at: ts(),
        updated_at: ts(),
        property_id,
        url: "https://cdn.example.com/p.jpg".to_string(),
        caption: None,
        sort_order: 0,
        is_primary,
    }
}

pub fn inquiry_model(property_id: Uuid, name: &str) -> property_inquiry::Model {
    property_inquiry::Model {
        id: Uuid::new_v4(),
        created_at: ts(),
        updated_at: ts(),
        property_id,
        name: name.to_string(),
        email: "buyer@example.com".to_string(),
        phone: None,
        message: "Is this still available?".to_string(),
        status: "NEW".to_string(),
    }
}

pub fn otp_model(email: &str, code_hash: &str, attempts: i32) -> otp_code::Model {
    otp_code::Model {
        id: Uuid::new_v4(),
        created_at: ts(),
        updated_at: ts(),
        email: email.to_string(),
        purpose: "password_reset".to_string(),
        code_hash: code_hash.to_string(),
        expires_at: far_future(),
        attempts,
        consumed_at: None,
    }
}

pub fn platform_user_model(name: &str, user_type: &str) -> platform_user::Model {
    platform_user::Model {
        id: Uuid::new_v4(),
        created_at: ts(),
        updated_at: ts(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        phone: None,
        user_type: user_type.to_string(),
        is_active: true,
    }
}

/// Row shape returned by `SELECT COUNT(*) AS num_items`.
pub fn count_row(count: i64) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([("num_items", Value::BigInt(Some(count)))])
}

/// Collects outbound messages instead of delivering them.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingSender {
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, message: OutboundMessage) -> Result<(), AppError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }
        Ok(())
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        auth: Some(AuthConfig::new(
            TEST_JWT_SECRET,
            "admin@example.com",
            "adminpassword",
        )),
        ..AppConfig::default()
    }
}

pub fn test_state(db: DatabaseConnection) -> Arc<AppState> {
    let cfg = test_config();
    let providers = build_providers(
        cfg.auth.as_ref().expect("auth config should be present"),
        &DaoContext::new(&db),
    )
    .expect("create auth providers");
    AppState::new(cfg, db, providers, Arc::new(RecordingSender::default()))
}

pub fn test_router(db: DatabaseConnection) -> Router {
    router(test_state(db))
}

/// Signs an access token the test router accepts once the mock returns a
/// live session row for `session_id`.
pub fn access_token(admin_id: Uuid, roles: &[&str], session_id: Uuid) -> String {
    let claims = make_access_claims(
        admin_id,
        "ops@example.com",
        roles.iter().map(|role| role.to_string()).collect(),
        session_id,
        300,
    );
    encode_token(&JwtKeys::from_secret(TEST_JWT_SECRET.as_bytes()), &claims)
        .expect("token should encode")
}
