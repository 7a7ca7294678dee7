use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::AsyncSmtpTransport;
use lettre::AsyncTransport;
use lettre::Message;
use lettre::Tokio1Executor;

use crate::config::MailConfig;
use crate::identity::errors::NotifierError;
use crate::identity::models::EmailAddress;
use crate::identity::ports::Notifier;

const OTP_SUBJECT: &str = "Verify your account with OTP.";

/// SMTP notifier delivering one-time codes by email.
///
/// With no SMTP host configured the transport runs in no-op mode and only
/// logs that a delivery was suppressed. The code itself is never logged.
pub struct SmtpNotifier {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Build the notifier from mail configuration.
    ///
    /// # Errors
    /// * `InvalidRecipient` - The configured sender address does not parse
    /// * `Transport` - The SMTP relay could not be configured
    pub fn new(config: &MailConfig) -> Result<Self, NotifierError> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| NotifierError::InvalidRecipient(e.to_string()))?;

        let transport = if config.smtp_host.trim().is_empty() {
            tracing::warn!("SMTP host not configured; notifier will operate in no-op mode");
            None
        } else {
            let mut builder =
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                    .map_err(|e| NotifierError::Transport(e.to_string()))?
                    .port(config.smtp_port);

            if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password)
            {
                builder =
                    builder.credentials(Credentials::new(username.clone(), password.clone()));
            }

            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, from })
    }

    fn otp_body(name: &str, code: &str) -> String {
        format!(
            r#"<div style="font-family: sans-serif; max-width: 480px; margin: 0 auto;">
    <h2>Verify your account</h2>
    <p>Hi {name},</p>
    <p>Use the following one-time code to verify your account. It expires in 5 minutes.</p>
    <p style="font-size: 32px; font-weight: bold; letter-spacing: 8px;">{code}</p>
    <p style="color: #666; font-size: 13px;">If you did not request this code, you can ignore this email.</p>
</div>"#
        )
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_otp(
        &self,
        to: &EmailAddress,
        name: &str,
        code: &str,
    ) -> Result<(), NotifierError> {
        let transport = match &self.transport {
            Some(transport) => Arc::clone(transport),
            None => {
                tracing::info!(recipient = %to, "SMTP disabled; code delivery suppressed");
                return Ok(());
            }
        };

        let recipient = to
            .as_str()
            .parse::<Mailbox>()
            .map_err(|e| NotifierError::InvalidRecipient(e.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(OTP_SUBJECT)
            .header(ContentType::TEXT_HTML)
            .body(Self::otp_body(name, code))
            .map_err(|e| NotifierError::Message(e.to_string()))?;

        transport
            .send(message)
            .await
            .map_err(|e| NotifierError::Transport(e.to_string()))?;

        tracing::debug!(recipient = %to, "One-time code dispatched");
        Ok(())
    }
}
