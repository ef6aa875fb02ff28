pub mod admin_service;
pub mod auth_service;
pub mod context;
pub mod dashboard_service;
pub mod notification;
pub mod otp_service;
pub mod permission_service;
pub mod property_service;
pub mod role_service;
pub mod user_service;

pub use context::ServiceContext;
