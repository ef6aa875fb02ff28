use estate_entity_derive::base_entity;
use sea_orm::entity::prelude::*;

#[base_entity]
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "admin_user_roles")]
pub struct Model {
    #[sea_orm(indexed)]
    pub admin_user_id: Uuid,
    #[sea_orm(indexed)]
    pub role_id: Uuid,
    pub granted_by: Option<Uuid>,
    /// Assignments past this instant no longer grant anything.
    pub expires_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(belongs_to, from = "admin_user_id", to = "id", on_delete = "Cascade")]
    pub admin_user: HasOne<super::admin_user::Entity>,
    #[sea_orm(belongs_to, from = "role_id", to = "id", on_delete = "Cascade")]
    pub role: HasOne<super::role::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the assignment still grants its role at `now`.
    pub fn is_live_at(&self, now: DateTimeWithTimeZone) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}
