pub mod activity_log_dao;
pub mod admin_user_dao;
pub mod base;
pub mod base_traits;
mod context;
pub mod dashboard_dao;
pub mod error;
pub mod otp_dao;
pub mod permission_dao;
pub mod platform_user_dao;
pub mod property_dao;
pub mod refresh_token_dao;
pub mod role_dao;
pub mod session_dao;

pub use activity_log_dao::{ActivityLogDao, NewActivity};
pub use admin_user_dao::{AdminUserDao, NewAdminUser};
pub use base::{ColumnFilter, CompareOp, DaoBase, FilterOp, PaginatedResponse};
pub use base_traits::{HasCreatedAtColumn, HasIdActiveModel, TimestampedActiveModel};
pub use context::DaoContext;
pub use dashboard_dao::{DashboardDao, PropertyScope};
pub use error::{DaoLayerError, DaoResult};
pub use otp_dao::OtpDao;
pub use permission_dao::PermissionDao;
pub use platform_user_dao::PlatformUserDao;
pub use property_dao::{PropertyDao, PropertyFilter};
pub use refresh_token_dao::RefreshTokenDao;
pub use role_dao::RoleDao;
pub use session_dao::SessionDao;
