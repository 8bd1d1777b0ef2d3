use anyhow::Context;
use axum::async_trait;
use lettre::{
    message::header::ContentType, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_reset_email(&self, to: &str, reset_link: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    pub fn new(host: &str, port: u16, from_address: &str) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .build();
        Ok(Self {
            transport,
            from_address: from_address.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_reset_email(&self, to: &str, reset_link: &str) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.from_address.parse().context("parse from address")?)
            .to(to.parse().context("parse recipient address")?)
            .subject("Reset your password")
            .header(ContentType::TEXT_PLAIN)
            .body(format!(
                "A password reset was requested for your account.\n\n\
                 Open the link below to choose a new password. \
                 The link expires shortly and can be used once.\n\n{}\n\n\
                 If you did not request this, you can ignore this email.",
                reset_link
            ))
            .context("build reset email")?;

        self.transport
            .send(email)
            .await
            .context("smtp send reset email")?;
        Ok(())
    }
}
