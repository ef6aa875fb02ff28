use estate_entity_derive::base_entity;
use sea_orm::entity::prelude::*;

#[base_entity]
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "admin_sessions")]
pub struct Model {
    #[sea_orm(indexed)]
    pub admin_user_id: Uuid,
    pub expires_at: DateTimeWithTimeZone,
    #[sea_orm(default_value = true)]
    pub is_active: bool,
    pub last_seen_at: Option<DateTimeWithTimeZone>,
    pub user_agent: Option<String>,
    #[sea_orm(belongs_to, from = "admin_user_id", to = "id", on_delete = "Cascade")]
    pub admin_user: HasOne<super::admin_user::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
