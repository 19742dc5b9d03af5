use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::errors::ServiceError;

type SmtpTransport = AsyncSmtpTransport<Tokio1Executor>;

/// Outbound mail seam. Account flows only need fire-and-forget HTML mail;
/// tests substitute a recording implementation.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), ServiceError>;
}

/// SMTP-backed mailer using STARTTLS relay credentials.
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        from: &str,
    ) -> Result<Self, ServiceError> {
        let creds = Credentials::new(username.to_string(), password.to_string());
        let mailer = SmtpTransport::starttls_relay(host)
            .map_err(|e| ServiceError::EmailError(format!("Failed to create SMTP relay: {e}")))?
            .credentials(creds)
            .port(port)
            .build();

        let from: Mailbox = from
            .parse()
            .map_err(|e| ServiceError::EmailError(format!("Invalid sender address: {e}")))?;

        Ok(Self { mailer, from })
    }

    /// Builds a mailer from configuration, falling back to a logging stub
    /// when SMTP is not configured.
    pub fn from_config(cfg: &AppConfig) -> Result<Arc<dyn Mailer>, ServiceError> {
        match (&cfg.smtp_host, &cfg.smtp_username, &cfg.smtp_password) {
            (Some(host), Some(user), Some(pass)) => Ok(Arc::new(Self::new(
                host,
                cfg.smtp_port,
                user,
                pass,
                &cfg.smtp_from,
            )?)),
            _ => {
                info!("SMTP not configured; outbound mail will be logged only");
                Ok(Arc::new(LogMailer))
            }
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), ServiceError> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| ServiceError::EmailError(format!("Invalid recipient address: {e}")))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| ServiceError::EmailError(format!("Failed to build email: {e}")))?;

        match self.mailer.send(email).await {
            Ok(_) => {
                info!(%subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                error!("Failed to send email: {e}");
                Err(ServiceError::EmailError(format!(
                    "Failed to send email: {e}"
                )))
            }
        }
    }
}

/// Development mailer that logs instead of sending.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _html_body: &str) -> Result<(), ServiceError> {
        info!(%to, %subject, "Mail delivery skipped (SMTP not configured)");
        Ok(())
    }
}
