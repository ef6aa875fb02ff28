use estate_entity_derive::base_entity;
use sea_orm::entity::prelude::*;

#[base_entity]
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "platform_users")]
pub struct Model {
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub phone: Option<String>,
    /// `BUYER`, `SELLER` or `AGENT`.
    #[sea_orm(indexed)]
    pub user_type: String,
    #[sea_orm(default_value = true)]
    pub is_active: bool,
}

impl ActiveModelBehavior for ActiveModel {}
