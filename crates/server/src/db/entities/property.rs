use estate_entity_derive::base_entity;
use sea_orm::entity::prelude::*;

#[base_entity]
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "properties")]
pub struct Model {
    pub title: String,
    pub description: Option<String>,
    pub property_type: String,
    pub listing_type: String,
    pub price: f64,
    pub area: f64,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub address: String,
    #[sea_orm(indexed)]
    pub city: String,
    pub state: String,
    pub pincode: Option<String>,
    #[sea_orm(indexed)]
    pub status: String,
    #[sea_orm(indexed)]
    pub approval_status: String,
    #[sea_orm(default_value = true)]
    pub is_active: bool,
    #[sea_orm(default_value = false)]
    pub is_verified: bool,
    #[sea_orm(default_value = false)]
    pub is_featured: bool,
    #[sea_orm(default_value = 0)]
    pub view_count: i64,
    #[sea_orm(default_value = 0)]
    pub inquiry_count: i64,
    pub created_by_admin_id: Option<Uuid>,
    #[sea_orm(indexed)]
    pub owner_user_id: Option<Uuid>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTimeWithTimeZone>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTimeWithTimeZone>,
    pub rejection_reason: Option<String>,
    pub flag_reason: Option<String>,
    pub published_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(belongs_to, from = "created_by_admin_id", to = "id", on_delete = "SetNull")]
    pub created_by_admin: HasOne<super::admin_user::Entity>,
    #[sea_orm(belongs_to, from = "owner_user_id", to = "id", on_delete = "SetNull")]
    pub owner: HasOne<super::platform_user::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
