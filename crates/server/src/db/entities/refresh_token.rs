use estate_entity_derive::base_entity;
use sea_orm::entity::prelude::*;

#[base_entity]
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "refresh_tokens")]
pub struct Model {
    #[sea_orm(indexed)]
    pub admin_user_id: Uuid,
    #[sea_orm(indexed)]
    pub session_id: Uuid,
    /// SHA-256 hex digest; the raw token is never stored.
    #[sea_orm(unique)]
    pub token_hash: String,
    pub expires_at: DateTimeWithTimeZone,
    #[sea_orm(default_value = true)]
    pub is_active: bool,
    pub last_used_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(belongs_to, from = "session_id", to = "id", on_delete = "Cascade")]
    pub session: HasOne<super::admin_session::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
