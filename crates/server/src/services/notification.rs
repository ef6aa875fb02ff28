use async_trait::async_trait;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivery seam for transactional messages.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<(), AppError>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMessageSender;

#[async_trait]
impl MessageSender for LogMessageSender {
    async fn send(&self, message: OutboundMessage) -> Result<(), AppError> {
        tracing::info!(to = %message.to, subject = %message.subject, "outbound message");
        tracing::debug!(body = %message.body, "outbound message body");
        Ok(())
    }
}

pub fn password_reset_message(to: &str, code: &str, ttl_secs: i64) -> OutboundMessage {
    let minutes = (ttl_secs + 59) / 60;
    OutboundMessage {
        to: to.to_string(),
        subject: "Your password reset code".to_string(),
        body: format!(
            "Use the code {code} to reset your admin password. \
             It expires in {minutes} minute{}. \
             If you did not ask for a reset you can ignore this message.",
            if minutes == 1 { "" } else { "s" }
        ),
    }
}

pub fn password_changed_message(to: &str) -> OutboundMessage {
    OutboundMessage {
        to: to.to_string(),
        subject: "Your password was changed".to_string(),
        body: "Your admin password was just changed and every active session was signed out. \
               Contact a super admin if this was not you."
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{password_changed_message, password_reset_message};

    #[test]
    fn reset_message_carries_code_and_rounded_expiry() {
        let message = password_reset_message("ops@example.com", "482913", 600);

        assert_eq!(message.to, "ops@example.com");
        assert!(message.body.contains("482913"));
        assert!(message.body.contains("10 minutes"));
    }

    #[test]
    fn short_ttl_reads_as_single_minute() {
        let message = password_reset_message("ops@example.com", "000001", 30);

        assert!(message.body.contains("1 minute."));
    }

    #[test]
    fn change_notice_mentions_signed_out_sessions() {
        assert!(password_changed_message("ops@example.com").body.contains("signed out"));
    }
}
