use estate_entity_derive::base_entity;
use sea_orm::entity::prelude::*;

#[base_entity(append_only)]
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "admin_activity_logs")]
pub struct Model {
    #[sea_orm(indexed)]
    pub admin_user_id: Option<Uuid>,
    pub action: String,
    pub resource: String,
    pub resource_id: Option<Uuid>,
    pub success: bool,
    pub details: Option<Json>,
    #[sea_orm(belongs_to, from = "admin_user_id", to = "id", on_delete = "SetNull")]
    pub admin_user: HasOne<super::admin_user::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
