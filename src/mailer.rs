use axum::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, error};

use crate::config::SmtpConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: String) -> anyhow::Result<()>;
}

/// SMTP delivery via lettre.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html: String) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)?;

        self.transport.send(message).await.map_err(|e| {
            error!(error = %e, %to, "smtp send failed");
            anyhow::anyhow!("smtp send failed: {e}")
        })?;
        debug!(%to, "email sent");
        Ok(())
    }
}

pub fn verification_email(client_base_url: &str, email: &str, token: &str) -> String {
    format!(
        "<h6>Your account has been created.</h6>\
         <p>Please confirm your account:</p>\
         <a href=\"{client_base_url}/confirm-user?email={email}&token={token}\">Confirm account</a>"
    )
}

pub fn password_reset_email(client_base_url: &str, email: &str, token: &str) -> String {
    format!(
        "<p>Follow the link below to change the password of your account:</p>\
         <a href=\"{client_base_url}/reset-password?email={email}&token={token}\">Change password</a>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_email_embeds_link() {
        let html = verification_email("http://localhost:3000", "a@b.com", "deadbeef");
        assert!(html.contains("http://localhost:3000/confirm-user?email=a@b.com&token=deadbeef"));
    }

    #[test]
    fn password_reset_email_embeds_link() {
        let html = password_reset_email("http://localhost:3000", "a@b.com", "deadbeef");
        assert!(html.contains("http://localhost:3000/reset-password?email=a@b.com&token=deadbeef"));
    }
}
