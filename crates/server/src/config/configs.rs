use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::auth::providers::AuthProviderId;

use super::{defaults, envconfig::EnvConfig, validate};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub logging: LoggingConfig,
    pub database: Option<DatabaseConfig>,
    pub auth: Option<AuthConfig>,
    pub otp: OtpConfig,
    pub dashboard: DashboardConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        <Self as EnvConfig>::from_env()
    }
}

impl EnvConfig for AppConfig {
    fn validate(&self) -> Result<()> {
        validate::validate(self)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            host: defaults::DEFAULT_HOST.to_string(),
            port: defaults::DEFAULT_PORT as u16,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub rust_log: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            rust_log: defaults::DEFAULT_RUST_LOG.to_string(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    /// Single-line events, for log shippers.
    Compact,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_db_min_idle")]
    pub min_idle: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    #[serde(default = "default_auth_provider")]
    pub provider: AuthProviderId,
    pub jwt_secret: String,
    pub admin_email: String,
    pub admin_password: String,
    /// Lifetime of a signed access token.
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: i64,
    /// Lifetime of the persisted session row, independent of the access token.
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    #[serde(default = "default_refresh_ttl_days")]
    pub refresh_ttl_days: i64,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: impl Into<String>,
        admin_email: impl Into<String>,
        admin_password: impl Into<String>,
    ) -> Self {
        Self {
            provider: default_auth_provider(),
            jwt_secret: jwt_secret.into(),
            admin_email: admin_email.into(),
            admin_password: admin_password.into(),
            access_ttl_secs: default_access_ttl_secs(),
            session_ttl_hours: default_session_ttl_hours(),
            refresh_ttl_days: default_refresh_ttl_days(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OtpConfig {
    pub ttl_secs: i64,
    /// Minimum gap between two codes sent to the same address.
    pub cooldown_secs: i64,
    pub max_attempts: i32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_secs: defaults::DEFAULT_OTP_TTL_SECS,
            cooldown_secs: defaults::DEFAULT_OTP_COOLDOWN_SECS,
            max_attempts: defaults::DEFAULT_OTP_MAX_ATTEMPTS as i32,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub trend_months: u32,
    pub commission_rate: f64,
    pub query_timeout_secs: u64,
    pub recent_activity_limit: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            trend_months: defaults::DEFAULT_TREND_MONTHS as u32,
            commission_rate: defaults::DEFAULT_COMMISSION_RATE,
            query_timeout_secs: defaults::DEFAULT_QUERY_TIMEOUT_SECS as u64,
            recent_activity_limit: defaults::DEFAULT_RECENT_ACTIVITY_LIMIT as u64,
        }
    }
}

fn default_db_max_connections() -> u32 {
    defaults::DEFAULT_DB_MAX_CONNECTIONS as u32
}

fn default_db_min_idle() -> u32 {
    defaults::DEFAULT_DB_MIN_IDLE as u32
}

fn default_auth_provider() -> AuthProviderId {
    AuthProviderId::Local
}

fn default_access_ttl_secs() -> i64 {
    defaults::DEFAULT_ACCESS_TTL_SECS
}

fn default_session_ttl_hours() -> i64 {
    defaults::DEFAULT_SESSION_TTL_HOURS
}

fn default_refresh_ttl_days() -> i64 {
    defaults::DEFAULT_REFRESH_TTL_DAYS
}
