use estate_entity_derive::base_entity;
use sea_orm::entity::prelude::*;

#[base_entity]
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub description: Option<String>,
    #[sea_orm(default_value = false)]
    pub is_system_role: bool,
    #[sea_orm(has_many)]
    pub grants: HasMany<super::role_permission::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
