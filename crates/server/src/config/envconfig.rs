use std::path::Path;

use ::config as config_rs;
use anyhow::{Context, Result};
use config_rs::{ConfigBuilder, builder::DefaultState};
use serde::de::DeserializeOwned;

/// Layered configuration: an optional file named by `ESTATE_CONFIG_FILE`,
/// then `APP_`-prefixed environment variables with `__` between sections
/// (`APP_AUTH__JWT_SECRET` is `auth.jwt_secret`).
pub trait EnvConfig: Sized + DeserializeOwned {
    const PREFIX: &'static str = "APP";
    const SEPARATOR: &'static str = "__";
    const FILE_VAR: &'static str = "ESTATE_CONFIG_FILE";

    fn load_dotenv() {
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        if dotenvy::from_filename(manifest_dir.join(".env")).is_err() {
            let _ = dotenvy::dotenv();
        }
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Deserializes and validates whatever sources `builder` carries.
    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let cfg = builder
            .build()
            .context("failed to read configuration sources")?
            .try_deserialize::<Self>()
            .context("failed to deserialize configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_env() -> Result<Self> {
        Self::load_dotenv();

        let mut builder = config_rs::Config::builder();
        if let Ok(path) = std::env::var(Self::FILE_VAR) {
            builder = builder.add_source(config_rs::File::with_name(&path).required(true));
        }
        Self::from_builder(
            builder.add_source(
                config_rs::Environment::with_prefix(Self::PREFIX)
                    .prefix_separator("_")
                    .separator(Self::SEPARATOR)
                    .try_parsing(true),
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use ::config::{Config, File, FileFormat};

    use super::EnvConfig;
    use crate::config::{AppConfig, LogFormat};

    fn load(toml: &str) -> anyhow::Result<AppConfig> {
        AppConfig::from_builder(
            Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
        )
    }

    #[test]
    fn file_sections_override_defaults() {
        let cfg = load(
            r#"
            [general]
            port = 8080

            [logging]
            format = "compact"

            [auth]
            jwt_secret = "s3cret"
            admin_email = "root@example.com"
            admin_password = "long-enough"

            [dashboard]
            commission_rate = 0.03
            "#,
        )
        .expect("config should load");

        assert_eq!(cfg.general.port, 8080);
        assert_eq!(cfg.general.host, "127.0.0.1");
        assert_eq!(cfg.logging.format, LogFormat::Compact);
        let auth = cfg.auth.expect("auth section");
        assert_eq!(auth.access_ttl_secs, 24 * 60 * 60);
        assert_eq!(cfg.dashboard.commission_rate, 0.03);
        assert_eq!(cfg.otp.max_attempts, 5);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = load("[general]\nportt = 1\n").expect_err("typo should fail");
        assert!(format!("{err:#}").contains("portt"));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let err = load("[otp]\nttl_secs = 0\n").expect_err("zero ttl should fail");
        assert!(err.to_string().contains("otp.ttl_secs"));
    }
}
