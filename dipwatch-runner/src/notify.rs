//! Notification sinks.

use lettre::address::AddressError;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::info;

use crate::config::{MailSection, Secrets};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid mail address: {0}")]
    Address(#[from] AddressError),
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Delivers one alert. `image` is an optional PNG chart.
pub trait Notifier: Send + Sync {
    fn send(&self, subject: &str, html_body: &str, image: Option<&[u8]>) -> Result<(), NotifyError>;
}

/// HTML mail over SMTP with STARTTLS.
pub struct SmtpNotifier {
    transport: SmtpTransport,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    pub fn new(settings: &MailSection, secrets: &Secrets) -> Result<Self, NotifyError> {
        let credentials = Credentials::new(
            secrets.mail_user.clone(),
            secrets.mail_password.expose_secret().to_string(),
        );
        let transport = SmtpTransport::starttls_relay(&settings.smtp_host)?
            .port(settings.smtp_port)
            .credentials(credentials)
            .build();
        Ok(Self {
            transport,
            from: secrets.mail_user.parse()?,
            to: secrets.target_email.parse()?,
        })
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, subject: &str, html_body: &str, image: Option<&[u8]>) -> Result<(), NotifyError> {
        let message = build_message(&self.from, &self.to, subject, html_body, image)?;
        self.transport.send(&message)?;
        info!(subject, to = %self.to, "mail sent");
        Ok(())
    }
}

/// HTML message, with the image as an inline `chart` part when present.
pub fn build_message(
    from: &Mailbox,
    to: &Mailbox,
    subject: &str,
    html_body: &str,
    image: Option<&[u8]>,
) -> Result<Message, NotifyError> {
    let builder = Message::builder()
        .from(from.clone())
        .to(to.clone())
        .subject(subject);
    let html = SinglePart::html(html_body.to_string());

    let message = match image {
        Some(png) => {
            let content_type = ContentType::parse("image/png")
                .map_err(|e| NotifyError::Rejected(e.to_string()))?;
            let chart = Attachment::new_inline("chart".to_string()).body(png.to_vec(), content_type);
            builder.multipart(MultiPart::related().singlepart(html).singlepart(chart))?
        }
        None => builder.singlepart(html)?,
    };
    Ok(message)
}

/// Logs alerts instead of sending them (dry runs).
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, subject: &str, html_body: &str, image: Option<&[u8]>) -> Result<(), NotifyError> {
        info!(
            subject,
            body_bytes = html_body.len(),
            has_image = image.is_some(),
            "dry run: alert not sent"
        );
        Ok(())
    }
}
