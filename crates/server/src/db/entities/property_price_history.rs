use estate_entity_derive::base_entity;
use sea_orm::entity::prelude::*;

#[base_entity(append_only)]
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "property_price_history")]
pub struct Model {
    #[sea_orm(indexed)]
    pub property_id: Uuid,
    pub old_price: f64,
    pub new_price: f64,
    pub changed_by: Option<Uuid>,
    #[sea_orm(belongs_to, from = "property_id", to = "id", on_delete = "Cascade")]
    pub property: HasOne<super::property::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
