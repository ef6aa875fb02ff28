use estate_entity_derive::base_entity;
use sea_orm::entity::prelude::*;

#[base_entity]
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "permissions")]
pub struct Model {
    #[sea_orm(indexed)]
    pub resource: String,
    pub action: String,
    /// `resource:action`, the unique identity of a permission.
    #[sea_orm(unique)]
    pub name: String,
    pub description: Option<String>,
}

impl ActiveModelBehavior for ActiveModel {}
