pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: i64 = 4000;
pub const DEFAULT_RUST_LOG: &str = "info,tower_http=info,sea_orm=warn";
pub const DEFAULT_DB_MAX_CONNECTIONS: i64 = 10;
pub const DEFAULT_DB_MIN_IDLE: i64 = 2;
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 24 * 60 * 60;
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 7 * 24;
pub const DEFAULT_REFRESH_TTL_DAYS: i64 = 30;
pub const DEFAULT_OTP_TTL_SECS: i64 = 10 * 60;
pub const DEFAULT_OTP_COOLDOWN_SECS: i64 = 60;
pub const DEFAULT_OTP_MAX_ATTEMPTS: i64 = 5;
pub const DEFAULT_TREND_MONTHS: i64 = 6;
pub const DEFAULT_COMMISSION_RATE: f64 = 0.02;
pub const DEFAULT_QUERY_TIMEOUT_SECS: i64 = 10;
pub const DEFAULT_RECENT_ACTIVITY_LIMIT: i64 = 10;
