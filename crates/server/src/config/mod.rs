pub mod configs;
pub mod defaults;
pub mod envconfig;
pub mod validate;

pub use configs::{
    AppConfig, AuthConfig, DashboardConfig, DatabaseConfig, GeneralConfig, LogFormat, LoggingConfig,
    OtpConfig,
};
pub use envconfig::EnvConfig;
