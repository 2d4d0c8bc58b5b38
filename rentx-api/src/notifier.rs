use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

/// The payment slip uploaded by the customer
#[derive(Debug, Clone)]
pub struct Slip {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct PaymentNotice {
    pub contact: String,
    pub package: String,
    pub slip: Slip,
}

/// Outbound channel the operator watches for new payments
#[async_trait]
pub trait PaymentNotifier: Send + Sync {
    async fn notify(&self, notice: PaymentNotice) -> anyhow::Result<()>;
}

pub fn format_message(contact: &str, package: &str) -> String {
    format!(
        "\n🚨 **New order! (Rent-X)**\n👤 **Customer:** {}\n📦 **Package:** {}\n----------------------------------\n👇 **Payment proof**\n",
        contact, package
    )
}

/// Posts to a Discord-style webhook: `content` text plus the slip as `file`.
pub struct ChatWebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl ChatWebhookNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl PaymentNotifier for ChatWebhookNotifier {
    async fn notify(&self, notice: PaymentNotice) -> anyhow::Result<()> {
        if self.webhook_url.is_empty() {
            bail!("chat webhook URL is not configured");
        }

        let mut file = Part::bytes(notice.slip.bytes).file_name(notice.slip.file_name);
        if let Some(content_type) = notice.slip.content_type.as_deref() {
            file = file.mime_str(content_type).context("invalid slip content type")?;
        }

        let form = Form::new()
            .text("content", format_message(&notice.contact, &notice.package))
            .part("file", file);

        let response = self
            .client
            .post(&self.webhook_url)
            .multipart(form)
            .send()
            .await
            .context("chat webhook unreachable")?;

        if !response.status().is_success() {
            bail!("chat webhook answered {}", response.status());
        }

        tracing::info!("Payment notice for '{}' forwarded", notice.contact);
        Ok(())
    }
}
