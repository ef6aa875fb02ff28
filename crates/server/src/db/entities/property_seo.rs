use estate_entity_derive::base_entity;
use sea_orm::entity::prelude::*;

#[base_entity]
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "property_seo")]
pub struct Model {
    #[sea_orm(unique)]
    pub property_id: Uuid,
    pub meta_title: String,
    pub meta_description: String,
    pub meta_keywords: Option<String>,
    pub canonical_url: Option<String>,
    pub og_image: Option<String>,
    pub updated_by: Option<Uuid>,
    #[sea_orm(belongs_to, from = "property_id", to = "id", on_delete = "Cascade")]
    pub property: HasOne<super::property::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
