use estate_entity_derive::base_entity;
use sea_orm::entity::prelude::*;

#[base_entity]
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "property_images")]
pub struct Model {
    #[sea_orm(indexed)]
    pub property_id: Uuid,
    pub url: String,
    pub caption: Option<String>,
    #[sea_orm(default_value = 0)]
    pub sort_order: i32,
    #[sea_orm(default_value = false)]
    pub is_primary: bool,
    #[sea_orm(belongs_to, from = "property_id", to = "id", on_delete = "Cascade")]
    pub property: HasOne<super::property::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
