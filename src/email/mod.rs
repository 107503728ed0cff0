pub mod templates;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;

/// Outbound mail. One call per recipient.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), String>;
}

pub struct SystemMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SystemMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, String> {
        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("SMTP error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SystemMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), String> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| format!("Invalid from address: {e}"))?,
            )
            .to(to.parse().map_err(|e| format!("Invalid to address: {e}"))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| format!("Failed to build email: {e}"))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| format!("Failed to send email: {e}"))?;

        Ok(())
    }
}

/// Outcome of a batch of invitations.
#[derive(Debug, Default, serde::Serialize)]
pub struct InviteReport {
    pub sent: Vec<String>,
    pub failed: Vec<String>,
}

/// Send the same invitation to every recipient. A failing recipient is
/// recorded and skipped; the rest of the batch still goes out.
pub async fn send_invites(
    mailer: &dyn Mailer,
    recipients: &[String],
    subject: &str,
    html_body: &str,
) -> InviteReport {
    let mut report = InviteReport::default();
    for to in recipients {
        match mailer.send(to, subject, html_body).await {
            Ok(()) => report.sent.push(to.clone()),
            Err(e) => {
                tracing::warn!(recipient = %to, "Invitation not delivered: {e}");
                report.failed.push(to.clone());
            }
        }
    }
    report
}
