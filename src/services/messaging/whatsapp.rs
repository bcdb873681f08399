use anyhow::Context;
use async_trait::async_trait;

use super::{Button, ChatProvider, ListItem};

const GRAPH_API_BASE: &str = "https://graph.facebook.com/v18.0";

/// Meta WhatsApp Cloud API client.
pub struct WhatsAppProvider {
    access_token: String,
    phone_number_id: String,
    client: reqwest::Client,
}

impl WhatsAppProvider {
    pub fn new(access_token: String, phone_number_id: String) -> Self {
        Self {
            access_token,
            phone_number_id,
            client: reqwest::Client::new(),
        }
    }

    async fn post_message(&self, payload: serde_json::Value) -> anyhow::Result<()> {
        let url = format!("{GRAPH_API_BASE}/{}/messages", self.phone_number_id);

        self.client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await
            .context("failed to send WhatsApp message")?
            .error_for_status()
            .context("WhatsApp API returned error")?;

        Ok(())
    }
}

#[async_trait]
impl ChatProvider for WhatsAppProvider {
    async fn send_text(&self, to: &str, body: &str) -> anyhow::Result<()> {
        self.post_message(serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": body },
        }))
        .await
    }

    async fn send_list(
        &self,
        to: &str,
        body: &str,
        button_label: &str,
        items: &[ListItem],
    ) -> anyhow::Result<()> {
        let rows: Vec<serde_json::Value> = items
            .iter()
            .map(|item| {
                serde_json::json!({
                    "id": item.id,
                    "title": item.title,
                    "description": item.description.as_deref().unwrap_or(""),
                })
            })
            .collect();

        self.post_message(serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "interactive",
            "interactive": {
                "type": "list",
                "body": { "text": body },
                "action": {
                    "button": button_label,
                    "sections": [{ "title": button_label, "rows": rows }],
                },
            },
        }))
        .await
    }

    async fn send_buttons(&self, to: &str, body: &str, buttons: &[Button]) -> anyhow::Result<()> {
        let button_values: Vec<serde_json::Value> = buttons
            .iter()
            .map(|b| {
                serde_json::json!({
                    "type": "reply",
                    "reply": { "id": b.id, "title": b.title },
                })
            })
            .collect();

        self.post_message(serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "interactive",
            "interactive": {
                "type": "button",
                "body": { "text": body },
                "action": { "buttons": button_values },
            },
        }))
        .await
    }
}
