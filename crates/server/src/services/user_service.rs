use uuid::Uuid;

use crate::{
    db::{
        dao::{ActivityLogDao, DaoBase, NewActivity, PaginatedResponse, PlatformUserDao},
        entities::platform_user,
    },
    domain::property::UserType,
    error::AppError,
};

/// Buyers, sellers and agents of the public platform, as seen by admins.
#[derive(Clone)]
pub struct UserService {
    users: PlatformUserDao,
    activity: ActivityLogDao,
}

impl UserService {
    pub fn new(users: PlatformUserDao, activity: ActivityLogDao) -> Self {
        Self { users, activity }
    }

    pub async fn get(&self, id: Uuid) -> Result<platform_user::Model, AppError> {
        Ok(self.users.find_by_id(id).await?)
    }

    pub async fn list(
        &self,
        page: u64,
        page_size: u64,
        user_type: Option<UserType>,
        search: Option<String>,
    ) -> Result<PaginatedResponse<platform_user::Model>, AppError> {
        Ok(self
            .users
            .list(
                page,
                page_size,
                user_type.as_ref().map(UserType::as_str),
                search.as_deref(),
            )
            .await?)
    }

    pub async fn set_active(
        &self,
        actor: Uuid,
        id: Uuid,
        is_active: bool,
    ) -> Result<platform_user::Model, AppError> {
        let user = self.users.set_active(id, is_active).await?;
        let action = if is_active {
            "activate_user"
        } else {
            "deactivate_user"
        };
        self.activity
            .record(NewActivity::new(Some(actor), action, "platform_user").on(id))
            .await?;
        Ok(user)
    }
}
