use estate_entity_derive::base_entity;
use sea_orm::entity::prelude::*;

/// One status transition of a property. Rows are never updated.
#[base_entity(append_only)]
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "property_approval_actions")]
pub struct Model {
    #[sea_orm(indexed)]
    pub property_id: Uuid,
    pub action: String,
    pub previous_status: String,
    #[sea_orm(indexed)]
    pub new_status: String,
    pub performed_by: Option<Uuid>,
    pub message: Option<String>,
    pub notes: Option<String>,
    pub reason: Option<String>,
    #[sea_orm(belongs_to, from = "property_id", to = "id", on_delete = "Cascade")]
    pub property: HasOne<super::property::Entity>,
    #[sea_orm(belongs_to, from = "performed_by", to = "id", on_delete = "SetNull")]
    pub performer: HasOne<super::admin_user::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
