use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::application::ports::mailer::{Delivery, Mailer, OutgoingEmail};
use crate::bootstrap::config::Config;

/// Resend-compatible HTTP delivery.
pub struct ResendMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
    reply_to: Option<String>,
}

#[derive(Deserialize)]
struct SendResponse {
    id: Option<String>,
}

impl ResendMailer {
    pub fn new(api_url: String, api_key: String, from: String, reply_to: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            from,
            reply_to,
        }
    }

    fn payload(&self, email: &OutgoingEmail) -> serde_json::Value {
        let mut body = json!({
            "from": self.from,
            "to": [email.to],
            "subject": email.subject,
            "html": email.html,
            "text": email.text,
        });
        if let Some(reply_to) = &self.reply_to {
            body["reply_to"] = json!(reply_to);
        }
        body
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<Delivery> {
        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.payload(email))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("email request failed: {e}"))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("email provider returned status {status}: {text}");
        }
        let parsed: SendResponse = resp
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("failed to read email response: {e}"))?;
        Ok(Delivery::Sent { id: parsed.id })
    }
}

/// Used when no provider key is configured; messages are only logged.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<Delivery> {
        info!(to = %email.to, subject = %email.subject, "email_logged_not_sent");
        Ok(Delivery::NotConfigured)
    }
}

pub fn mailer_from_config(cfg: &Config) -> std::sync::Arc<dyn Mailer> {
    match &cfg.email_api_key {
        Some(key) => std::sync::Arc::new(ResendMailer::new(
            cfg.email_api_url.clone(),
            key.clone(),
            cfg.email_from.clone(),
            cfg.email_reply_to.clone(),
        )),
        None => std::sync::Arc::new(LogMailer),
    }
}
