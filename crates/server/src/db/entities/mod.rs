#[allow(unused_imports)]
pub mod prelude {
    pub use super::activity_log::Entity as ActivityLog;
    pub use super::admin_session::Entity as AdminSession;
    pub use super::admin_user::Entity as AdminUser;
    pub use super::admin_user_role::Entity as AdminUserRole;
    pub use super::approval_action::Entity as ApprovalAction;
    pub use super::otp_code::Entity as OtpCode;
    pub use super::permission::Entity as Permission;
    pub use super::platform_user::Entity as PlatformUser;
    pub use super::property::Entity as Property;
    pub use super::property_image::Entity as PropertyImage;
    pub use super::property_inquiry::Entity as PropertyInquiry;
    pub use super::property_price_history::Entity as PropertyPriceHistory;
    pub use super::property_seo::Entity as PropertySeo;
    pub use super::property_verification::Entity as PropertyVerification;
    pub use super::property_view::Entity as PropertyView;
    pub use super::refresh_token::Entity as RefreshToken;
    pub use super::role::Entity as Role;
    pub use super::role_permission::Entity as RolePermission;
}

pub mod activity_log;
pub mod admin_session;
pub mod admin_user;
pub mod admin_user_role;
pub mod approval_action;
pub mod otp_code;
pub mod permission;
pub mod platform_user;
pub mod property;
pub mod property_image;
pub mod property_inquiry;
pub mod property_price_history;
pub mod property_seo;
pub mod property_verification;
pub mod property_view;
pub mod refresh_token;
pub mod role;
pub mod role_permission;
