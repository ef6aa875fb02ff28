use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DaoLayerError {
    #[error("Database error: {0}")]
    Db(DbErr),
    #[error("{entity} not found (id={id})")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("Invalid pagination: page={page} page_size={page_size}")]
    InvalidPagination { page: u64, page_size: u64 },
    #[error("Duplicate value: {0}")]
    UniqueViolation(String),
    #[error("{entity} was changed by another request")]
    Stale { entity: &'static str },
}

pub type DaoResult<T> = Result<T, DaoLayerError>;

impl From<DbErr> for DaoLayerError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => Self::UniqueViolation(detail),
            _ => Self::Db(err),
        }
    }
}

impl DaoLayerError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    /// Maps a guarded write that matched no row to [`DaoLayerError::Stale`].
    pub fn stale_on_miss(entity: &'static str) -> impl FnOnce(DbErr) -> Self {
        move |err| match err {
            DbErr::RecordNotUpdated => Self::Stale { entity },
            other => Self::from(other),
        }
    }
}
