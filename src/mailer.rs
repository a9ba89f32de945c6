use async_trait::async_trait;

/// Outbound account e-mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_activation(&self, email: &str, link: &str) -> anyhow::Result<()>;
    async fn send_password_reset(&self, email: &str, link: &str) -> anyhow::Result<()>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_activation(&self, email: &str, link: &str) -> anyhow::Result<()> {
        tracing::info!(to = %email, link = %link, "activation email");
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, link: &str) -> anyhow::Result<()> {
        tracing::info!(to = %email, link = %link, "password reset email");
        Ok(())
    }
}
