//! SMTP delivery
//!
//! Each send opens its own connection (STARTTLS on 587, implicit TLS on 465),
//! authenticates, sends and closes. The connection is owned by the lettre
//! transport and closed when it drops, on success and on error.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{debug, info};

use crate::config::SmtpConfig;
use crate::error::{AlertError, Result};
use crate::types::EmailContent;

/// SMTP port that expects TLS from the first byte instead of STARTTLS
const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl OutgoingEmail {
    pub fn new(from: &str, to: &str, content: EmailContent) -> Self {
        Self { from: from.to_string(), to: to.to_string(), subject: content.subject, html: content.html }
    }
}

/// Delivery seam. The pipeline only talks to this trait.
pub trait Mailer {
    fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

/// Build the MIME message (single HTML part)
pub fn build_message(email: &OutgoingEmail) -> Result<Message> {
    Message::builder()
        .from(
            email
                .from
                .parse()
                .map_err(|e| AlertError::Email(format!("Invalid from address '{}': {}", email.from, e)))?,
        )
        .to(email
            .to
            .parse()
            .map_err(|e| AlertError::Email(format!("Invalid recipient '{}': {}", email.to, e)))?)
        .subject(email.subject.clone())
        .header(ContentType::TEXT_HTML)
        .body(email.html.clone())
        .map_err(|e| AlertError::Email(format!("Failed to build email: {}", e)))
}

/// 530/534/535: authentication required, mechanism too weak, bad credentials
fn is_auth_failure(err: &lettre::transport::smtp::Error) -> bool {
    err.status().map(|code| matches!(code.to_string().as_str(), "530" | "534" | "535")).unwrap_or(false)
}

/// Authenticated SMTP sender
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn create_transport(&self) -> Result<SmtpTransport> {
        let creds = Credentials::new(self.config.sender.clone(), self.config.password.clone());
        let builder = if self.config.port == IMPLICIT_TLS_PORT {
            SmtpTransport::relay(&self.config.host)
        } else {
            SmtpTransport::starttls_relay(&self.config.host)
        };
        let builder = builder
            .map_err(|e| AlertError::Email(format!("SMTP setup failed for {}: {}", self.config.host, e)))?;

        Ok(builder.port(self.config.port).credentials(creds).build())
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let message = build_message(email)?;
        let transport = self.create_transport()?;

        debug!("Connecting to SMTP server {}:{}", self.config.host, self.config.port);
        transport.send(&message).map_err(|e| {
            if is_auth_failure(&e) {
                AlertError::Auth(format!("SMTP authentication failed for {}: {}", self.config.sender, e))
            } else {
                AlertError::Email(format!("SMTP send failed: {}", e))
            }
        })?;

        info!("Email sent to {}", email.to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: &str) -> OutgoingEmail {
        OutgoingEmail::new(
            "alerts@example.com",
            to,
            EmailContent { subject: "Stock Alert: 1 stock gained 10%+ today".into(), html: "<p>hi</p>".into() },
        )
    }

    #[test]
    fn test_build_message_headers() {
        let message = build_message(&email("me@example.com")).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("From: alerts@example.com"));
        assert!(raw.contains("To: me@example.com"));
        assert!(raw.contains("Subject: Stock Alert: 1 stock gained 10%+ today"));
        assert!(raw.contains("Content-Type: text/html"));
    }

    #[test]
    fn test_invalid_recipient() {
        let err = build_message(&email("not-an-address")).unwrap_err();
        assert!(matches!(err, AlertError::Email(_)));
        assert!(err.to_string().contains("Invalid recipient"));
    }

    #[test]
    fn test_transport_builds_without_connecting() {
        let smtp = |port| SmtpConfig {
            host: "smtp.example.com".into(),
            port,
            sender: "alerts@example.com".into(),
            password: "pw".into(),
        };
        assert!(SmtpMailer::new(smtp(587)).create_transport().is_ok());
        assert!(SmtpMailer::new(smtp(465)).create_transport().is_ok());
    }
}
