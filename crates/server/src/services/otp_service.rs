use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    auth::{
        password::{MIN_PASSWORD_LEN, hash_password},
        providers::local::normalize_email,
        token::{digest, generate_otp_code},
    },
    config::OtpConfig,
    db::dao::{ActivityLogDao, AdminUserDao, DaoLayerError, NewActivity, OtpDao},
    error::AppError,
    services::notification::{MessageSender, password_changed_message, password_reset_message},
};

pub const PASSWORD_RESET_PURPOSE: &str = "password_reset";

const INVALID_CODE: &str = "Invalid or expired reset code";

/// One-time-code password reset for admin accounts.
#[derive(Clone)]
pub struct OtpService {
    otps: OtpDao,
    admins: AdminUserDao,
    activity: ActivityLogDao,
    messenger: Arc<dyn MessageSender>,
    cfg: OtpConfig,
}

impl OtpService {
    pub fn new(
        otps: OtpDao,
        admins: AdminUserDao,
        activity: ActivityLogDao,
        messenger: Arc<dyn MessageSender>,
        cfg: OtpConfig,
    ) -> Self {
        Self {
            otps,
            admins,
            activity,
            messenger,
            cfg,
        }
    }

    /// Sends a reset code to an active admin. Every address, known or not,
    /// gets a stored code and the same cooldown; only active admins are sent
    /// theirs.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AppError> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(AppError::bad_request("A valid email address is required"));
        }

        let now = Utc::now();
        if let Some(previous) = self.otps.latest(&email, PASSWORD_RESET_PURPOSE).await? {
            let elapsed = now - previous.created_at.with_timezone(&Utc);
            let remaining = self.cfg.cooldown_secs - elapsed.num_seconds();
            if remaining > 0 {
                return Err(AppError::rate_limited(remaining));
            }
        }

        let admin = self
            .admins
            .find_by_email(&email)
            .await?
            .filter(|admin| admin.is_active);
        let code = generate_otp_code();
        let expires_at = (now + Duration::seconds(self.cfg.ttl_secs)).fixed_offset();
        self.otps
            .issue(&email, PASSWORD_RESET_PURPOSE, digest(&code), expires_at)
            .await?;

        let Some(admin) = admin else {
            tracing::debug!("password reset requested for unknown or inactive address");
            return Ok(());
        };
        self.messenger
            .send(password_reset_message(&email, &code, self.cfg.ttl_secs))
            .await?;
        self.activity
            .record(
                NewActivity::new(Some(admin.id), "request_password_reset", "admin_user")
                    .on(admin.id),
            )
            .await?;

        tracing::info!(admin_id = %admin.id, "password reset code issued");
        Ok(())
    }

    /// Checks the code, replaces the password and signs the admin out
    /// everywhere.
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<Uuid, AppError> {
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::bad_request(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let email = normalize_email(email);
        let stored = self
            .otps
            .latest(&email, PASSWORD_RESET_PURPOSE)
            .await?
            .filter(|otp| otp.consumed_at.is_none())
            .ok_or_else(|| AppError::invalid_otp(INVALID_CODE))?;

        if stored.expires_at.with_timezone(&Utc) <= Utc::now() {
            return Err(AppError::invalid_otp(INVALID_CODE));
        }
        if !self
            .otps
            .claim_attempt(stored.id, self.cfg.max_attempts)
            .await?
        {
            return Err(AppError::invalid_otp("Too many attempts; request a new code"));
        }
        if digest(code.trim()) != stored.code_hash {
            return Err(AppError::invalid_otp(INVALID_CODE));
        }

        let admin = self
            .admins
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::invalid_otp(INVALID_CODE))?;

        let sessions = self
            .otps
            .redeem_for_reset(
                stored.id,
                admin.id,
                hash_password(new_password)?,
                NewActivity::new(Some(admin.id), "reset_password", "admin_user").on(admin.id),
            )
            .await
            .map_err(|err| match err {
                DaoLayerError::Stale { .. } => AppError::invalid_otp(INVALID_CODE),
                other => other.into(),
            })?;

        if let Err(err) = self.messenger.send(password_changed_message(&email)).await {
            tracing::warn!(error = %err, admin_id = %admin.id, "password change notice not sent");
        }
        tracing::info!(admin_id = %admin.id, sessions, "password reset completed");
        Ok(admin.id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};

    use super::OtpService;
    use crate::{
        auth::token::digest,
        config::OtpConfig,
        db::{
            dao::DaoContext,
            entities::{admin_user, otp_code},
        },
        test_helpers::{RecordingSender, activity_model, admin_model, otp_model},
    };

    const EMAIL: &str = "ops@example.com";

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn service(db: &DatabaseConnection, sender: Arc<RecordingSender>) -> OtpService {
        let daos = DaoContext::new(db);
        OtpService::new(
            daos.otp(),
            daos.admin_user(),
            daos.activity_log(),
            sender,
            OtpConfig::default(),
        )
    }

    #[tokio::test]
    async fn request_issues_code_and_sends_it() {
        let admin = admin_model(EMAIL, true);
        let sender = Arc::new(RecordingSender::default());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<otp_code::Model>::new()])
            .append_query_results([[admin.clone()]])
            .append_exec_results([exec(0)])
            .append_query_results([[otp_model(EMAIL, "digest", 0)]])
            .append_query_results([[activity_model(
                Some(admin.id),
                "request_password_reset",
                true,
            )]])
            .into_connection();

        service(&db, sender.clone())
            .request_password_reset(" Ops@Example.com ")
            .await
            .expect("request should succeed");

        let sent = sender.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, EMAIL);
        assert_eq!(sent[0].subject, "Your password reset code");
    }

    #[tokio::test]
    async fn unknown_address_succeeds_silently() {
        let sender = Arc::new(RecordingSender::default());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<otp_code::Model>::new()])
            .append_query_results([Vec::<admin_user::Model>::new()])
            .append_exec_results([exec(0)])
            .append_query_results([[otp_model("nobody@example.com", "digest", 0)]])
            .into_connection();

        service(&db, sender.clone())
            .request_password_reset("nobody@example.com")
            .await
            .expect("unknown address should not leak");

        assert!(sender.messages().is_empty());
        let sql = format!("{:?}", db.into_transaction_log());
        assert!(sql.contains("INSERT INTO"), "code row should still be stored: {sql}");
        assert!(!sql.contains("admin_activity_logs"), "{sql}");
    }

    #[tokio::test]
    async fn unknown_address_repeat_is_throttled_like_a_known_one() {
        let recent = |email: &str| otp_code::Model {
            created_at: Utc::now().fixed_offset(),
            ..otp_model(email, "digest", 0)
        };
        let mut codes = Vec::new();
        for email in [EMAIL, "nobody@example.com"] {
            let db = MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[recent(email)]])
                .into_connection();
            let err = service(&db, Arc::new(RecordingSender::default()))
                .request_password_reset(email)
                .await
                .expect_err("cooldown should apply to every address");
            codes.push(err.code());
        }

        assert_eq!(codes, vec!["RATE_LIMITED", "RATE_LIMITED"]);
    }

    #[tokio::test]
    async fn second_request_inside_cooldown_is_rate_limited() {
        let recent = otp_code::Model {
            created_at: Utc::now().fixed_offset(),
            ..otp_model(EMAIL, "digest", 0)
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[recent]])
            .into_connection();

        let err = service(&db, Arc::new(RecordingSender::default()))
            .request_password_reset(EMAIL)
            .await
            .expect_err("cooldown should apply");

        assert_eq!(err.code(), "RATE_LIMITED");
        assert!(err.message().contains("seconds"));
    }

    #[tokio::test]
    async fn wrong_code_counts_an_attempt() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[otp_model(EMAIL, &digest("123456"), 0)]])
            .append_exec_results([exec(1)])
            .into_connection();

        let err = service(&db, Arc::new(RecordingSender::default()))
            .reset_password(EMAIL, "654321", "new-password")
            .await
            .expect_err("wrong code should fail");

        assert_eq!(err.code(), "INVALID_OTP");
        let sql = format!("{:?}", db.into_transaction_log());
        assert!(sql.contains("attempts"), "{sql}");
    }

    #[tokio::test]
    async fn exhausted_code_is_refused_even_with_the_right_digits() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[otp_model(EMAIL, &digest("123456"), 5)]])
            .append_exec_results([exec(0)])
            .into_connection();

        let err = service(&db, Arc::new(RecordingSender::default()))
            .reset_password(EMAIL, "123456", "new-password")
            .await
            .expect_err("exhausted code should fail");

        assert_eq!(err.code(), "INVALID_OTP");
        assert!(err.message().contains("Too many attempts"));
    }

    #[tokio::test]
    async fn guess_that_loses_the_last_attempt_is_not_evaluated() {
        let read_before_race = otp_model(EMAIL, &digest("123456"), 4);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[read_before_race]])
            .append_exec_results([exec(0)])
            .into_connection();

        let err = service(&db, Arc::new(RecordingSender::default()))
            .reset_password(EMAIL, "123456", "new-password")
            .await
            .expect_err("attempt limit is enforced by the store");

        assert_eq!(err.code(), "INVALID_OTP");
        let sql = format!("{:?}", db.into_transaction_log());
        assert!(!sql.contains("password_hash"), "{sql}");
    }

    #[tokio::test]
    async fn consumed_code_is_invalid() {
        let consumed = otp_code::Model {
            consumed_at: Some(Utc::now().fixed_offset()),
            ..otp_model(EMAIL, &digest("123456"), 0)
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[consumed]])
            .into_connection();

        let err = service(&db, Arc::new(RecordingSender::default()))
            .reset_password(EMAIL, "123456", "new-password")
            .await
            .expect_err("consumed code should fail");

        assert_eq!(err.code(), "INVALID_OTP");
    }

    #[tokio::test]
    async fn correct_code_resets_password_and_revokes_sessions() {
        let admin = admin_model(EMAIL, true);
        let otp = otp_model(EMAIL, &digest("123456"), 1);
        let sender = Arc::new(RecordingSender::default());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[otp.clone()]])
            .append_exec_results([exec(1)])
            .append_query_results([[admin.clone()]])
            .append_exec_results([exec(1), exec(1), exec(2), exec(2)])
            .append_query_results([[activity_model(Some(admin.id), "reset_password", true)]])
            .into_connection();

        let admin_id = service(&db, sender.clone())
            .reset_password(EMAIL, "123456", "new-password")
            .await
            .expect("reset should succeed");

        assert_eq!(admin_id, admin.id);
        let sent = sender.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Your password was changed");
        let sql = format!("{:?}", db.into_transaction_log());
        assert!(sql.contains("admin_sessions"), "{sql}");
        assert!(sql.contains("refresh_tokens"), "{sql}");
        assert!(sql.contains("password_hash"), "{sql}");
    }

    #[tokio::test]
    async fn code_redeemed_concurrently_is_invalid() {
        let admin = admin_model(EMAIL, true);
        let sender = Arc::new(RecordingSender::default());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[otp_model(EMAIL, &digest("123456"), 0)]])
            .append_exec_results([exec(1)])
            .append_query_results([[admin.clone()]])
            .append_exec_results([exec(0)])
            .into_connection();

        let err = service(&db, sender.clone())
            .reset_password(EMAIL, "123456", "new-password")
            .await
            .expect_err("second redemption should fail");

        assert_eq!(err.code(), "INVALID_OTP");
        assert!(sender.messages().is_empty());
    }

    #[tokio::test]
    async fn short_password_is_rejected_before_touching_the_code() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = service(&db, Arc::new(RecordingSender::default()))
            .reset_password(EMAIL, "123456", "short")
            .await
            .expect_err("short password should fail");

        assert_eq!(err.code(), "BAD_USER_INPUT");
        assert!(db.into_transaction_log().is_empty());
    }
}
