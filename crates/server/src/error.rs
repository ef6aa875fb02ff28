#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    InvalidCredentials(String),
    InvalidOtp(String),
    RateLimited {
        message: String,
        retry_after_secs: i64,
    },
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn invalid_credentials() -> Self {
        Self::InvalidCredentials("Invalid email or password".to_string())
    }

    pub fn invalid_otp(message: impl Into<String>) -> Self {
        Self::InvalidOtp(message.into())
    }

    pub fn rate_limited(retry_after_secs: i64) -> Self {
        Self::RateLimited {
            message: format!("Please wait {retry_after_secs} seconds before requesting a new code"),
            retry_after_secs,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::InvalidCredentials(message)
            | Self::InvalidOtp(message)
            | Self::RateLimited { message, .. }
            | Self::Internal(message) => message.as_str(),
        }
    }

    /// Stable machine-readable code surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_USER_INPUT",
            Self::Unauthorized(_) => "UNAUTHENTICATED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::InvalidCredentials(_) => "INVALID_CREDENTIALS",
            Self::InvalidOtp(_) => "INVALID_OTP",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AppError {}

impl From<crate::db::dao::DaoLayerError> for AppError {
    fn from(err: crate::db::dao::DaoLayerError) -> Self {
        match err {
            crate::db::dao::DaoLayerError::NotFound { .. } => AppError::not_found(err.to_string()),
            crate::db::dao::DaoLayerError::InvalidPagination { .. } => {
                AppError::bad_request(err.to_string())
            }
            crate::db::dao::DaoLayerError::UniqueViolation(_)
            | crate::db::dao::DaoLayerError::Stale { .. } => AppError::conflict(err.to_string()),
            crate::db::dao::DaoLayerError::Db(_) => AppError::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::DbErr;
    use uuid::Uuid;

    use crate::db::dao::DaoLayerError;

    use super::AppError;

    #[test]
    fn codes_are_stable() {
        assert_eq!(AppError::unauthorized("x").code(), "UNAUTHENTICATED");
        assert_eq!(AppError::forbidden("x").code(), "FORBIDDEN");
        assert_eq!(AppError::invalid_credentials().code(), "INVALID_CREDENTIALS");
        assert_eq!(AppError::invalid_otp("x").code(), "INVALID_OTP");
        assert_eq!(AppError::internal("x").code(), "INTERNAL_ERROR");
    }

    #[test]
    fn rate_limit_message_names_remaining_seconds() {
        let err = AppError::rate_limited(42);

        assert_eq!(err.code(), "RATE_LIMITED");
        assert!(err.message().contains("42 seconds"));
    }

    #[test]
    fn dao_errors_map_to_client_codes() {
        let id = Uuid::new_v4();
        let not_found = AppError::from(DaoLayerError::NotFound {
            entity: "property",
            id,
        });
        let db = AppError::from(DaoLayerError::Db(DbErr::Custom("boom".to_string())));
        let stale = AppError::from(DaoLayerError::Stale { entity: "property" });

        assert_eq!(not_found.code(), "NOT_FOUND");
        assert_eq!(db.code(), "INTERNAL_ERROR");
        assert_eq!(stale.code(), "CONFLICT");
    }

    #[test]
    fn converts_into_anyhow_for_startup() {
        fn startup() -> anyhow::Result<()> {
            Err(AppError::internal("auth provider missing"))?
        }

        let err = startup().expect_err("error should propagate");
        assert_eq!(err.to_string(), "auth provider missing");
    }
}
