//! Implemented for every entity by `#[base_entity]`.

use sea_orm::{EntityTrait, prelude::DateTimeWithTimeZone};
use uuid::Uuid;

pub trait HasCreatedAtColumn: EntityTrait {
    fn created_at_column() -> Self::Column;
}

pub trait HasIdActiveModel {
    fn set_id(&mut self, id: Uuid);
}

pub trait TimestampedActiveModel {
    fn set_created_at(&mut self, ts: DateTimeWithTimeZone);

    /// Append-only rows have no `updated_at` and keep this no-op.
    fn set_updated_at(&mut self, _ts: DateTimeWithTimeZone) {}
}
