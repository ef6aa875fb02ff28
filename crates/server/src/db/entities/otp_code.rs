use estate_entity_derive::base_entity;
use sea_orm::entity::prelude::*;

#[base_entity]
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "otp_codes")]
pub struct Model {
    #[sea_orm(indexed)]
    pub email: String,
    pub purpose: String,
    pub code_hash: String,
    pub expires_at: DateTimeWithTimeZone,
    #[sea_orm(default_value = 0)]
    pub attempts: i32,
    pub consumed_at: Option<DateTimeWithTimeZone>,
}

impl ActiveModelBehavior for ActiveModel {}
