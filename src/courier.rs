// FILE: src/courier.rs
//! Courier: delivers notifications (e.g. an ebook to a reading device).
//!
//! Delivery is fire-and-forget from the pipeline's point of view. A failed
//! send is reported, never retried, and never undoes a move.

use crate::config::MailSettings;
use crate::error::{Result, SortError};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::path::{Path, PathBuf};

const EPUB_MIME: &str = "application/epub+zip";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub attachment: Option<PathBuf>,
}

impl Notification {
    /// Subject is the file's base name, body is empty.
    pub fn for_attachment(path: &Path) -> Self {
        let subject = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            subject,
            body: String::new(),
            attachment: Some(path.to_path_buf()),
        }
    }
}

pub trait Courier: Send + Sync {
    fn send(&self, notification: &Notification) -> Result<()>;
}

/// STARTTLS SMTP relay, authenticated as the sender.
pub struct SmtpCourier {
    settings: MailSettings,
}

impl SmtpCourier {
    pub fn new(settings: MailSettings) -> Self {
        Self { settings }
    }

    fn build_message(&self, notification: &Notification) -> Result<Message> {
        let from: Mailbox = self
            .settings
            .sender
            .parse()
            .map_err(|e| SortError::Notify(format!("bad sender address: {}", e)))?;
        let to: Mailbox = self
            .settings
            .recipient
            .parse()
            .map_err(|e| SortError::Notify(format!("bad recipient address: {}", e)))?;

        let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(notification.body.clone()));

        if let Some(path) = &notification.attachment {
            if !path.is_file() {
                return Err(SortError::Notify(format!(
                    "attachment missing: {}",
                    path.display()
                )));
            }
            let bytes = std::fs::read(path)?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let content_type = ContentType::parse(attachment_mime(path))
                .map_err(|e| SortError::Notify(e.to_string()))?;
            parts = parts.singlepart(Attachment::new(filename).body(bytes, content_type));
        }

        Message::builder()
            .from(from)
            .to(to)
            .subject(notification.subject.clone())
            .multipart(parts)
            .map_err(|e| SortError::Notify(e.to_string()))
    }
}

impl Courier for SmtpCourier {
    fn send(&self, notification: &Notification) -> Result<()> {
        let message = self.build_message(notification)?;

        let mailer = SmtpTransport::starttls_relay(&self.settings.smtp_host)
            .map_err(|e| SortError::Notify(e.to_string()))?
            .credentials(Credentials::new(
                self.settings.sender.clone(),
                self.settings.password.clone(),
            ))
            .build();

        mailer
            .send(&message)
            .map_err(|e| SortError::Notify(e.to_string()))?;

        tracing::info!(
            "[Courier] Email sent to {} with attachment: {:?}",
            self.settings.recipient,
            notification.attachment
        );
        Ok(())
    }
}

fn attachment_mime(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("epub") => EPUB_MIME,
        _ => "application/octet-stream",
    }
}
