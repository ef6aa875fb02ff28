use estate_entity_derive::base_entity;
use sea_orm::entity::prelude::*;

#[base_entity]
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "property_inquiries")]
pub struct Model {
    #[sea_orm(indexed)]
    pub property_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    /// `NEW`, `CONTACTED` or `CLOSED`.
    pub status: String,
    #[sea_orm(belongs_to, from = "property_id", to = "id", on_delete = "Cascade")]
    pub property: HasOne<super::property::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
