//! SMTP mail transport using lettre
//!
//! Messages are sent as multipart/alternative with a plain-text part derived
//! from the HTML body. Every message gets a Message-ID we generate ourselves
//! so the caller can store it as the thread anchor for a later follow-up.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use regex::Regex;
use uuid::Uuid;

use crate::core::compose::normalize_message_id;
use crate::error::{OutreachError, OutreachResult};
use crate::traits::{MailSender, OutgoingMail};
use shared::{run_debug, RunId};

/// Connection security for the SMTP session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Plain connection upgraded with STARTTLS
    #[default]
    StartTls,
    /// Implicit TLS (SMTPS)
    Tls,
    /// No encryption; local relays and tests only
    None,
}

impl std::str::FromStr for TlsMode {
    type Err = OutreachError;

    fn from_str(s: &str) -> OutreachResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "starttls" => Ok(TlsMode::StartTls),
            "tls" | "ssl" => Ok(TlsMode::Tls),
            "none" => Ok(TlsMode::None),
            other => Err(OutreachError::config("SMTP_TLS", format!("unknown mode '{other}'"))),
        }
    }
}

/// Configuration for the SMTP transport
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender address
    pub from: String,
    /// Display name shown next to the sender address
    pub from_name: Option<String>,
    pub tls: TlsMode,
    /// Connection timeout; `None` waits on the server indefinitely
    pub timeout: Option<Duration>,
}

impl SmtpConfig {
    pub const DEFAULT_PORT: u16 = 587;

    pub fn new(host: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            username: None,
            password: None,
            from: from.into(),
            from_name: None,
            tls: TlsMode::default(),
            timeout: None,
        }
    }
}

/// SMTP-based mail sender
#[derive(Clone)]
pub struct SmtpMailSender {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
    line_breaks: Regex,
    tags: Regex,
}

impl SmtpMailSender {
    /// Create a sender from explicit configuration
    pub fn from_config(config: SmtpConfig) -> OutreachResult<Self> {
        let address: Address = config
            .from
            .trim()
            .parse()
            .map_err(|_| OutreachError::InvalidAddress { address: config.from.clone() })?;
        let from = Mailbox::new(config.from_name.clone().filter(|n| !n.trim().is_empty()), address);

        let mut builder = match config.tls {
            TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
            TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| OutreachError::config("SMTP_HOST", e.to_string()))?,
            TlsMode::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| OutreachError::config("SMTP_HOST", e.to_string()))?,
        };

        builder = builder.port(config.port).timeout(config.timeout);

        if let (Some(username), Some(password)) = (config.username, config.password) {
            builder = builder.credentials(Credentials::new(username, password));
        }

        let line_breaks = Regex::new(r"(?i)<br\s*/?>").map_err(|e| OutreachError::config("html", e.to_string()))?;
        let tags = Regex::new(r"<[^>]+>").map_err(|e| OutreachError::config("html", e.to_string()))?;

        Ok(Self {
            transport: Arc::new(builder.build()),
            from,
            line_breaks,
            tags,
        })
    }

    /// Plain-text alternative of an HTML body
    pub fn plain_text(&self, html: &str) -> String {
        let with_breaks = self.line_breaks.replace_all(html, "\n");
        self.tags.replace_all(&with_breaks, "").into_owned()
    }

    fn generate_message_id(&self) -> String {
        format!("<{}@{}>", Uuid::new_v4().simple(), self.from.email.domain())
    }

    /// Build the lettre message and the Message-ID it carries
    pub fn build_message(&self, mail: &OutgoingMail) -> OutreachResult<(Message, String)> {
        let to: Mailbox = mail
            .to
            .trim()
            .parse()
            .map_err(|_| OutreachError::InvalidAddress { address: mail.to.clone() })?;

        let message_id = mail
            .message_id
            .as_deref()
            .map(normalize_message_id)
            .unwrap_or_else(|| self.generate_message_id());

        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.clone())
            .message_id(Some(message_id.clone()));

        if let Some(anchor) = mail.in_reply_to.as_deref() {
            let anchor = normalize_message_id(anchor);
            builder = builder.in_reply_to(anchor.clone()).references(anchor);
        }

        let message = builder
            .multipart(MultiPart::alternative_plain_html(
                self.plain_text(&mail.body),
                mail.body.clone(),
            ))
            .map_err(|e| OutreachError::send_failed(&mail.to, format!("failed to build message: {e}")))?;

        Ok((message, message_id))
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    async fn send(&self, mail: &OutgoingMail) -> OutreachResult<String> {
        let (message, message_id) = self.build_message(mail)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| {
                if e.is_permanent() {
                    OutreachError::send_rejected(&mail.to, e.to_string())
                } else {
                    OutreachError::send_failed(&mail.to, e.to_string())
                }
            })?;

        run_debug!(RunId::current(), "📤 SMTP accepted {} for {}", message_id, mail.to);
        Ok(message_id)
    }
}
