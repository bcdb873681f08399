pub mod whatsapp;

use async_trait::async_trait;

/// One option in an interactive list.
#[derive(Debug, Clone)]
pub struct ListItem {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
}

/// One button choice (WhatsApp allows at most three).
#[derive(Debug, Clone)]
pub struct Button {
    pub id: String,
    pub title: String,
}

/// Outbound chat transport. The conversation engine only depends on these
/// three primitives and on receiving back the selected id as a plain string.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn send_text(&self, to: &str, body: &str) -> anyhow::Result<()>;

    async fn send_list(
        &self,
        to: &str,
        body: &str,
        button_label: &str,
        items: &[ListItem],
    ) -> anyhow::Result<()>;

    async fn send_buttons(&self, to: &str, body: &str, buttons: &[Button]) -> anyhow::Result<()>;
}
