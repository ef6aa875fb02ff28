use sea_orm::DatabaseConnection;

use super::{
    ActivityLogDao, AdminUserDao, DaoBase, DashboardDao, OtpDao, PermissionDao, PlatformUserDao,
    PropertyDao, RefreshTokenDao, RoleDao, SessionDao,
};

#[derive(Clone)]
pub struct DaoContext {
    db: DatabaseConnection,
}

impl DaoContext {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub fn admin_user(&self) -> AdminUserDao {
        DaoBase::new(&self.db)
    }

    pub fn role(&self) -> RoleDao {
        DaoBase::new(&self.db)
    }

    pub fn permission(&self) -> PermissionDao {
        DaoBase::new(&self.db)
    }

    pub fn session(&self) -> SessionDao {
        DaoBase::new(&self.db)
    }

    pub fn refresh_token(&self) -> RefreshTokenDao {
        DaoBase::new(&self.db)
    }

    pub fn activity_log(&self) -> ActivityLogDao {
        DaoBase::new(&self.db)
    }

    pub fn otp(&self) -> OtpDao {
        DaoBase::new(&self.db)
    }

    pub fn platform_user(&self) -> PlatformUserDao {
        DaoBase::new(&self.db)
    }

    pub fn property(&self) -> PropertyDao {
        DaoBase::new(&self.db)
    }

    pub fn dashboard(&self) -> DashboardDao {
        DashboardDao::new(&self.db)
    }
}
