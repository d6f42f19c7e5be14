use std::sync::Mutex;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use tracing::info;

use crate::config::SmtpConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub fn reset_email(to: &str, reset_url: &str) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Password Reset Request".to_string(),
        body: format!(
            "To reset your password, visit the following link:\n{reset_url}\n\n\
             If you did not make this request, simply ignore this email and no changes will be made.\n"
        ),
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let credentials = Credentials::new(cfg.username.clone(), cfg.password.clone());
        let builder = if cfg.use_tls {
            SmtpTransport::starttls_relay(&cfg.server)
                .with_context(|| format!("smtp relay {}", cfg.server))?
        } else {
            SmtpTransport::builder_dangerous(&cfg.server)
        };
        let transport = builder.port(cfg.port).credentials(credentials).build();
        let sender = cfg
            .sender
            .parse::<Mailbox>()
            .with_context(|| format!("invalid MAIL_SENDER {}", cfg.sender))?;
        Ok(Self { transport, sender })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        let to = mail
            .to
            .parse::<Mailbox>()
            .with_context(|| format!("invalid recipient {}", mail.to))?;
        let message = Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)
            .context("build message")?;

        // lettre's SmtpTransport blocks
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .context("smtp task")?
            .context("smtp send")?;
        info!(to = %mail.to, "mail sent");
        Ok(())
    }
}

/// Keeps messages in memory instead of delivering them. Used when no SMTP
/// server is configured, and by tests to read reset links back.
#[derive(Default)]
pub struct OutboxMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn last_to(&self, to: &str) -> Option<OutgoingMail> {
        self.sent().into_iter().rev().find(|m| m.to == to)
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        info!(to = %mail.to, subject = %mail.subject, "mail queued in outbox");
        self.sent
            .lock()
            .map_err(|_| anyhow::anyhow!("outbox lock poisoned"))?
            .push(mail);
        Ok(())
    }
}
