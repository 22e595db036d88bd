use async_trait::async_trait;
use serde_json::json;

use crate::error::{Result, SupportDeskError};
use crate::interfaces::providers::Notifier;

/// Sends templated mail through an HTTP mail-relay API (`POST /messages`
/// with a bearer key). Bodies are plain text; the relay owns presentation.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
    /// Internal distribution address that receives escalation alerts.
    support_address: String,
    /// Base URL for password-reset links shown to customers.
    frontend_url: String,
}

impl HttpMailer {
    pub fn new(
        api_url: String,
        api_key: String,
        from: String,
        support_address: String,
        frontend_url: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            from,
            support_address,
            frontend_url,
        }
    }

    async fn deliver(&self, to: &str, subject: &str, text: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/messages", self.api_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "text": text,
            }))
            .send()
            .await
            .map_err(|e| SupportDeskError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SupportDeskError::Upstream(format!(
                "mail relay returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn send_password_reset(&self, email: &str, token: &str) -> Result<()> {
        let reset_url = format!("{}/reset-password?token={token}", self.frontend_url);
        let body = format!(
            "Hello,\n\n\
             We received a request to reset your password. Open the link below to create a new password:\n\n\
             {reset_url}\n\n\
             If you didn't request this, please ignore this email. Your password will remain unchanged.\n\
             This link will expire for security reasons.\n\n\
             Best regards,\nThe AI Support Team"
        );
        self.deliver(email, "Password Reset Request - AI Support", &body)
            .await
    }

    async fn send_escalation_alert(
        &self,
        customer_email: &str,
        summary: &str,
        notes: &str,
    ) -> Result<()> {
        let subject = format!("Escalated Support Request from {customer_email}");
        let mut body = format!(
            "Customer: {customer_email}\n\nConversation Summary:\n{summary}\n"
        );
        if !notes.is_empty() {
            body.push_str(&format!("\nAdditional Notes:\n{notes}\n"));
        }
        body.push_str(&format!(
            "\nAction Required: please reach out to the customer at {customer_email} to resolve their issue."
        ));
        self.deliver(&self.support_address, &subject, &body).await
    }

    async fn send_summary_copy(&self, email: &str, summary: &str) -> Result<()> {
        let body = format!(
            "Hello,\n\n\
             Thank you for contacting our support team. Here's a summary of your recent conversation:\n\n\
             {summary}\n\n\
             Our support team will reach out to you shortly to assist with your request.\n\n\
             Best regards,\nThe AI Support Team"
        );
        self.deliver(email, "Your Support Conversation Summary", &body)
            .await
    }
}
