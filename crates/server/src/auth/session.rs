use chrono::{Duration, Utc};
use uuid::Uuid;

use super::{
    Claims, TokenBundle,
    jwt::{JwtKeys, decode_token, encode_token, make_access_claims},
    token::{digest, generate_refresh_token},
};
use crate::{
    config::AuthConfig,
    db::{
        dao::{DaoLayerError, RefreshTokenDao, SessionDao},
        entities::refresh_token,
    },
    error::AppError,
};

#[derive(Debug, Clone, Copy)]
pub struct SessionTtl {
    pub access_secs: i64,
    pub session_hours: i64,
    pub refresh_days: i64,
}

impl From<&AuthConfig> for SessionTtl {
    fn from(cfg: &AuthConfig) -> Self {
        Self {
            access_secs: cfg.access_ttl_secs,
            session_hours: cfg.session_ttl_hours,
            refresh_days: cfg.refresh_ttl_days,
        }
    }
}

/// Mints access/refresh credentials backed by `admin_sessions` rows.
///
/// An access token is only honoured while its session row is active and
/// unexpired, so revoking the row invalidates tokens that still verify.
#[derive(Clone)]
pub struct SessionIssuer {
    sessions: SessionDao,
    refresh_tokens: RefreshTokenDao,
    jwt: JwtKeys,
    ttl: SessionTtl,
}

impl SessionIssuer {
    pub fn new(
        sessions: SessionDao,
        refresh_tokens: RefreshTokenDao,
        jwt: JwtKeys,
        ttl: SessionTtl,
    ) -> Self {
        Self {
            sessions,
            refresh_tokens,
            jwt,
            ttl,
        }
    }

    pub async fn create_session(
        &self,
        admin_id: Uuid,
        email: &str,
        roles: Vec<String>,
        user_agent: Option<String>,
    ) -> Result<TokenBundle, AppError> {
        let now = Utc::now();
        let session = self
            .sessions
            .open(
                admin_id,
                (now + Duration::hours(self.ttl.session_hours)).fixed_offset(),
                user_agent,
            )
            .await?;

        let refresh_token = self.create_refresh_token(admin_id, session.id).await?;
        self.bundle(admin_id, email, roles, session.id, refresh_token)
    }

    /// Returns the claims of a token whose session is still live; every
    /// failure, including store errors, yields `None`.
    pub async fn validate(&self, token: &str) -> Option<Claims> {
        let claims = match decode_token(&self.jwt, token, true) {
            Ok(claims) => claims,
            Err(err) => {
                tracing::debug!(error = %err, "rejecting access token");
                return None;
            }
        };
        let (admin_id, session_id) = (claims.admin_id()?, claims.session_id()?);

        match self
            .sessions
            .find_live(session_id, Utc::now().fixed_offset())
            .await
        {
            Ok(Some(session)) if session.admin_user_id == admin_id => Some(claims),
            Ok(_) => None,
            Err(err) => {
                tracing::error!(error = %err, %session_id, "session lookup failed");
                None
            }
        }
    }

    /// Deactivates the token's session and its refresh tokens. Tokens that do
    /// not parse are ignored.
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        let Some(session_id) = decode_token(&self.jwt, token, false)
            .ok()
            .and_then(|claims| claims.session_id())
        else {
            return Ok(());
        };

        self.sessions.deactivate(session_id).await?;
        self.refresh_tokens.revoke_for_session(session_id).await?;
        Ok(())
    }

    pub async fn revoke_all(&self, admin_id: Uuid) -> Result<u64, AppError> {
        let sessions = self.sessions.deactivate_all_for(admin_id).await?;
        self.refresh_tokens.revoke_all_for(admin_id).await?;
        Ok(sessions)
    }

    /// Stores the digest of a fresh refresh token and returns the raw value.
    pub async fn create_refresh_token(
        &self,
        admin_id: Uuid,
        session_id: Uuid,
    ) -> Result<String, AppError> {
        let raw = generate_refresh_token();
        self.refresh_tokens
            .issue(
                admin_id,
                session_id,
                digest(&raw),
                self.refresh_expiry(),
            )
            .await?;
        Ok(raw)
    }

    /// Looks the presented token up by digest and records the use.
    pub async fn validate_refresh_token(
        &self,
        raw: &str,
    ) -> Result<Option<refresh_token::Model>, AppError> {
        let Some(stored) = self
            .refresh_tokens
            .find_usable(&digest(raw), Utc::now().fixed_offset())
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(self.refresh_tokens.touch(stored.id).await?))
    }

    /// Retires `current`, extends its session and issues a new pair for it.
    pub async fn rotate(
        &self,
        current: refresh_token::Model,
        email: &str,
        roles: Vec<String>,
    ) -> Result<TokenBundle, AppError> {
        let admin_id = current.admin_user_id;
        let session_id = current.session_id;

        let Some(_) = self
            .sessions
            .find_live(session_id, Utc::now().fixed_offset())
            .await?
        else {
            return Err(AppError::unauthorized("Session has ended"));
        };

        let raw = generate_refresh_token();
        self.refresh_tokens
            .rotate(current, digest(&raw), self.refresh_expiry())
            .await
            .map_err(|err| match err {
                DaoLayerError::Stale { .. } => {
                    AppError::unauthorized("Refresh token has already been used")
                }
                other => other.into(),
            })?;
        self.sessions
            .extend(
                session_id,
                (Utc::now() + Duration::hours(self.ttl.session_hours)).fixed_offset(),
            )
            .await?;

        self.bundle(admin_id, email, roles, session_id, raw)
    }

    fn refresh_expiry(&self) -> sea_orm::prelude::DateTimeWithTimeZone {
        (Utc::now() + Duration::days(self.ttl.refresh_days)).fixed_offset()
    }

    fn bundle(
        &self,
        admin_id: Uuid,
        email: &str,
        roles: Vec<String>,
        session_id: Uuid,
        refresh_token: String,
    ) -> Result<TokenBundle, AppError> {
        let claims = make_access_claims(admin_id, email, roles, session_id, self.ttl.access_secs);
        Ok(TokenBundle {
            access_token: encode_token(&self.jwt, &claims)?,
            refresh_token,
            token_type: "Bearer",
            expires_in: self.ttl.access_secs,
            admin_id,
            session_id,
        })
    }
}
