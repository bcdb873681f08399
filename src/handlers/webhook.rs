use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::services::conversation;
use crate::state::AppState;

// ── Meta subscription verification ──

#[derive(Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

pub async fn verify_webhook(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let mode_ok = params.mode.as_deref() == Some("subscribe");
    let token_ok = params.verify_token.as_deref() == Some(state.config.whatsapp_verify_token.as_str());

    if mode_ok && token_ok {
        tracing::info!("webhook verification succeeded");
        params.challenge.unwrap_or_default().into_response()
    } else {
        tracing::warn!("webhook verification failed");
        (StatusCode::FORBIDDEN, "verification failed").into_response()
    }
}

// ── Inbound payload ──

#[derive(Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Deserialize)]
struct Entry {
    #[serde(default)]
    changes: Vec<Change>,
}

#[derive(Deserialize)]
struct Change {
    value: ChangeValue,
}

#[derive(Deserialize)]
struct ChangeValue {
    #[serde(default)]
    contacts: Vec<Contact>,
    #[serde(default)]
    messages: Vec<InboundMessage>,
}

#[derive(Deserialize)]
struct Contact {
    wa_id: String,
    profile: Option<ContactProfile>,
}

#[derive(Deserialize)]
struct ContactProfile {
    name: Option<String>,
}

#[derive(Deserialize)]
struct InboundMessage {
    from: String,
    #[serde(rename = "type")]
    kind: String,
    text: Option<TextBody>,
    interactive: Option<Interactive>,
}

#[derive(Deserialize)]
struct TextBody {
    body: String,
}

#[derive(Deserialize)]
struct Interactive {
    list_reply: Option<ReplyBody>,
    button_reply: Option<ReplyBody>,
}

#[derive(Deserialize)]
struct ReplyBody {
    id: String,
}

fn validate_signature(app_secret: &str, signature_header: &str, body: &[u8]) -> bool {
    let Some(signature_hex) = signature_header.strip_prefix("sha256=") else {
        return false;
    };

    let mut mac = match Hmac::<Sha256>::new_from_slice(app_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());

    expected == signature_hex
}

pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    // Signature check is skipped when the app secret is unconfigured (dev mode).
    if !state.config.whatsapp_app_secret.is_empty() {
        let signature = headers
            .get("x-hub-signature-256")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !validate_signature(&state.config.whatsapp_app_secret, signature, &body) {
            tracing::warn!("invalid webhook signature");
            return StatusCode::FORBIDDEN;
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable webhook payload");
            // Meta retries on non-2xx; a malformed body will never get better.
            return StatusCode::OK;
        }
    };

    for entry in payload.entry {
        for change in entry.changes {
            for message in &change.value.messages {
                process_inbound(&state, message, &change.value.contacts).await;
            }
        }
    }

    StatusCode::OK
}

async fn process_inbound(state: &Arc<AppState>, message: &InboundMessage, contacts: &[Contact]) {
    let from = message.from.as_str();

    let sender_name = contacts
        .iter()
        .find(|c| c.wa_id == from)
        .and_then(|c| c.profile.as_ref())
        .and_then(|p| p.name.as_deref());

    // Serialize per phone so a second event for the same customer cannot
    // interleave with one still being processed.
    let lock = state.conversations.key_lock(from);
    let _guard = lock.lock().await;

    let result = match message.kind.as_str() {
        "text" => {
            let body = message.text.as_ref().map(|t| t.body.as_str()).unwrap_or("");
            conversation::handle_message(state, from, body, sender_name).await
        }
        "interactive" => {
            let reply_id = message.interactive.as_ref().and_then(|i| {
                i.list_reply
                    .as_ref()
                    .or(i.button_reply.as_ref())
                    .map(|r| r.id.as_str())
            });
            match reply_id {
                Some(id) => conversation::handle_reply(state, from, id).await,
                None => {
                    tracing::warn!(from, "interactive message without reply id");
                    Ok(())
                }
            }
        }
        other => {
            tracing::debug!(from, kind = other, "ignoring unsupported message type");
            Ok(())
        }
    };

    if let Err(e) = result {
        // Infrastructure failure: full detail stays in the logs, the customer
        // gets a generic apology and their conversation state is kept so a
        // retry can resume.
        tracing::error!(error = %e, from, "failed to process inbound message");
        let _ = state
            .chat
            .send_text(from, "⚠️ Bir sorun oluştu. Lütfen birazdan tekrar deneyin.")
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_signature() {
        let body = br#"{"entry":[]}"#;
        let mut mac = Hmac::<Sha256>::new_from_slice(b"secret").unwrap();
        mac.update(body);
        let header = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

        assert!(validate_signature("secret", &header, body));
        assert!(!validate_signature("other", &header, body));
        assert!(!validate_signature("secret", "sha256=deadbeef", body));
        assert!(!validate_signature("secret", "md5=abc", body));
    }
}
