use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    auth::providers::AuthProviders,
    config::{DashboardConfig, OtpConfig},
    db::dao::DaoContext,
    services::{
        admin_service::AdminService, auth_service::AuthService,
        dashboard_service::DashboardService, notification::MessageSender, otp_service::OtpService,
        permission_service::PermissionResolver, property_service::PropertyService,
        role_service::RoleService, user_service::UserService,
    },
    state::AppState,
};

#[derive(Clone)]
pub struct ServiceContext {
    daos: DaoContext,
}

impl ServiceContext {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self {
            daos: DaoContext::new(db),
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(&state.db)
    }

    pub fn daos(&self) -> &DaoContext {
        &self.daos
    }

    pub fn auth<'a>(&self, providers: &'a AuthProviders) -> AuthService<'a> {
        AuthService::new(providers)
    }

    pub fn permissions(&self) -> PermissionResolver {
        PermissionResolver::new(self.daos.permission())
    }

    pub fn admin(&self) -> AdminService {
        AdminService::new(
            self.daos.admin_user(),
            self.daos.role(),
            self.daos.session(),
            self.daos.refresh_token(),
            self.daos.activity_log(),
        )
    }

    pub fn role(&self) -> RoleService {
        RoleService::new(
            self.daos.role(),
            self.daos.permission(),
            self.daos.admin_user(),
            self.daos.activity_log(),
        )
    }

    pub fn user(&self) -> UserService {
        UserService::new(self.daos.platform_user(), self.daos.activity_log())
    }

    pub fn property(&self) -> PropertyService {
        PropertyService::new(
            self.daos.property(),
            self.daos.platform_user(),
            self.daos.activity_log(),
        )
    }

    pub fn dashboard(&self, cfg: &DashboardConfig) -> DashboardService {
        DashboardService::new(self.daos.dashboard(), cfg.clone())
    }

    pub fn otp(&self, messenger: Arc<dyn MessageSender>, cfg: &OtpConfig) -> OtpService {
        OtpService::new(
            self.daos.otp(),
            self.daos.admin_user(),
            self.daos.activity_log(),
            messenger,
            cfg.clone(),
        )
    }
}
