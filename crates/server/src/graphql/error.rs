use async_graphql::{Error, ErrorExtensions};

use crate::{error::AppError, response::client_message};

pub type GqlResult<T> = async_graphql::Result<T>;

/// Every error leaves with `extensions.code`; internal details are logged
/// and replaced with a generic message.
impl ErrorExtensions for AppError {
    fn extend(&self) -> Error {
        if self.is_internal() {
            tracing::error!(code = self.code(), error = %self, "graphql operation failed");
        }
        let code = self.code().to_string();
        let retry_after = match self {
            AppError::RateLimited {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        };

        Error::new(client_message(self)).extend_with(|_, extensions| {
            extensions.set("code", code);
            if let Some(secs) = retry_after {
                extensions.set("retryAfter", secs);
            }
        })
    }
}

pub trait IntoGql<T> {
    fn gql(self) -> GqlResult<T>;
}

impl<T> IntoGql<T> for Result<T, AppError> {
    fn gql(self) -> GqlResult<T> {
        self.map_err(|err| err.extend())
    }
}
