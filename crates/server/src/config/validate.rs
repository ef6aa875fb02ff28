use anyhow::{Result, bail};

use super::AppConfig;

pub fn validate(cfg: &AppConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    if cfg.general.host.trim().is_empty() {
        errors.push("general.host must not be empty".to_string());
    }

    if let Some(database) = cfg.database.as_ref() {
        if database.url.trim().is_empty() {
            errors.push("database.url must not be empty".to_string());
        }

        if database.min_idle > database.max_connections {
            errors.push(format!(
                "database.min_idle ({}) must be <= database.max_connections ({})",
                database.min_idle, database.max_connections
            ));
        }
    }

    if let Some(auth) = cfg.auth.as_ref() {
        if auth.admin_email.trim().is_empty() {
            errors.push("auth.admin_email must not be empty".to_string());
        }

        if auth.admin_password.len() < 8 {
            errors.push("auth.admin_password must be at least 8 characters".to_string());
        }

        if auth.jwt_secret.trim().is_empty() {
            errors.push("auth.jwt_secret must not be empty".to_string());
        }

        if auth.access_ttl_secs <= 0 {
            errors.push("auth.access_ttl_secs must be > 0".to_string());
        }

        if auth.session_ttl_hours <= 0 {
            errors.push("auth.session_ttl_hours must be > 0".to_string());
        }

        if auth.refresh_ttl_days <= 0 {
            errors.push("auth.refresh_ttl_days must be > 0".to_string());
        }
    }

    if cfg.otp.ttl_secs <= 0 {
        errors.push("otp.ttl_secs must be > 0".to_string());
    }

    if cfg.otp.cooldown_secs < 0 {
        errors.push("otp.cooldown_secs must be >= 0".to_string());
    }

    if cfg.otp.max_attempts <= 0 {
        errors.push("otp.max_attempts must be > 0".to_string());
    }

    if cfg.dashboard.trend_months == 0 || cfg.dashboard.trend_months > 24 {
        errors.push("dashboard.trend_months must be between 1 and 24".to_string());
    }

    if !(0.0..=1.0).contains(&cfg.dashboard.commission_rate) {
        errors.push("dashboard.commission_rate must be within 0.0..=1.0".to_string());
    }

    if cfg.dashboard.query_timeout_secs == 0 {
        errors.push("dashboard.query_timeout_secs must be > 0".to_string());
    }

    if errors.is_empty() {
        return Ok(());
    }

    bail!("invalid app config:\n- {}", errors.join("\n- "))
}
