//! Telegram Bot API transport.
//!
//! Outbound text goes through `sendMessage`; inbound messages are long-polled
//! from `getUpdates` and answered by [`ChatLogin::handle_inbound`].

use super::{ChatLogin, DeliveryError, InboundMessage, Messenger};
use crate::APP_USER_AGENT;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::{
    sync::watch,
    time::{sleep, Duration},
};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

const POLL_TIMEOUT_SECONDS: u64 = 30;
const MAX_BACKOFF_SECONDS: u64 = 60;

#[derive(Clone)]
pub struct TelegramBot {
    client: Client,
    api_url: Url,
    token: SecretString,
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot")
            .field("api_url", &self.api_url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    from: Option<Sender>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct Sender {
    username: Option<String>,
}

impl Update {
    fn into_inbound(self) -> Option<InboundMessage> {
        let message = self.message?;
        Some(InboundMessage {
            sender_handle: message.from.and_then(|from| from.username),
            chat_id: message.chat.id,
            text: message.text?,
        })
    }
}

impl TelegramBot {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built or `api_url` is not a
    /// valid URL.
    pub fn new(api_url: &str, token: SecretString) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECONDS + 10))
            .build()?;

        Ok(Self {
            client,
            api_url: Url::parse(api_url)?,
            token,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.api_url.as_str().trim_end_matches('/'),
            self.token.expose_secret()
        )
    }

    /// Call a Bot API method and return its `result` field.
    ///
    /// The API answers `{"ok": false, "description": ...}` with a 4xx status on
    /// failure, so the body is parsed before the status is looked at.
    async fn call(&self, method: &str, payload: &Value) -> Result<Value, DeliveryError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(payload)
            .send()
            .await
            .map_err(|err| DeliveryError::Transport(err.without_url().to_string()))?;

        let status = response.status();

        let json_response: Value = response
            .json()
            .await
            .map_err(|err| DeliveryError::Transport(format!("{method} - {status}, {err}")))?;

        if json_response["ok"].as_bool() != Some(true) {
            let description = json_response["description"].as_str().unwrap_or("");
            return Err(classify(&format!("{method} - {status}, {description}")));
        }

        Ok(json_response["result"].clone())
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, DeliveryError> {
        let result = self
            .call(
                "getUpdates",
                &json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECONDS,
                    "allowed_updates": ["message"],
                }),
            )
            .await?;

        serde_json::from_value(result)
            .map_err(|err| DeliveryError::Transport(format!("getUpdates: {err}")))
    }

    /// Long-poll inbound messages and answer each one until `shutdown` flips.
    ///
    /// Failed polls back off exponentially, capped at one minute.
    pub async fn poll_updates(self: Arc<Self>, login: ChatLogin, mut shutdown: watch::Receiver<bool>) {
        let mut offset = 0;
        let mut failures: u32 = 0;

        info!("telegram update polling started");

        loop {
            let updates = tokio::select! {
                _ = shutdown.wait_for(|stop| *stop) => break,
                updates = self.get_updates(offset) => updates,
            };

            let updates = match updates {
                Ok(updates) => {
                    failures = 0;
                    updates
                }
                Err(err) => {
                    failures = failures.saturating_add(1);
                    let backoff = backoff_seconds(failures);
                    warn!("telegram getUpdates failed: {err}, retrying in {backoff} seconds");

                    tokio::select! {
                        _ = shutdown.wait_for(|stop| *stop) => break,
                        () = sleep(Duration::from_secs(backoff)) => continue,
                    }
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);

                let Some(message) = update.into_inbound() else {
                    continue;
                };

                self.answer(&login, &message).await;
            }
        }

        info!("telegram update polling stopped");
    }

    #[instrument(skip(self, login, message), fields(chat_id = message.chat_id))]
    async fn answer(&self, login: &ChatLogin, message: &InboundMessage) {
        let reply = login.handle_inbound(message).await;

        debug!(%reply, "replying to inbound message");

        if let Err(err) = self.deliver_text(message.chat_id, &reply).await {
            error!("failed to reply to inbound message: {err}");
        }
    }
}

#[async_trait]
impl Messenger for TelegramBot {
    async fn deliver_text(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError> {
        self.call("sendMessage", &json!({ "chat_id": chat_id, "text": text }))
            .await
            .map(|_| ())
    }
}

/// Map a Bot API failure description to a delivery error.
fn classify(description: &str) -> DeliveryError {
    if description.contains("chat_id is empty") {
        DeliveryError::DestinationEmpty
    } else {
        DeliveryError::Transport(description.to_string())
    }
}

fn backoff_seconds(failures: u32) -> u64 {
    2u64.saturating_pow(failures.saturating_sub(1))
        .min(MAX_BACKOFF_SECONDS)
}

/// Validate a bot token shape (`<digits>:<secret>`) before using it.
///
/// # Errors
/// Returns an error describing the malformed token.
pub fn check_token(token: &SecretString) -> Result<()> {
    let token = token.expose_secret();
    let (bot_id, secret) = token
        .split_once(':')
        .ok_or_else(|| anyhow!("telegram bot token must look like <id>:<secret>"))?;

    if bot_id.is_empty() || !bot_id.chars().all(|c| c.is_ascii_digit()) || secret.is_empty() {
        return Err(anyhow!("telegram bot token must look like <id>:<secret>"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chat_id_is_destination_empty() {
        assert_eq!(
            classify("sendMessage - 400 Bad Request, Bad Request: chat_id is empty"),
            DeliveryError::DestinationEmpty
        );
        assert!(matches!(
            classify("sendMessage - 403 Forbidden, Forbidden: bot was blocked by the user"),
            DeliveryError::Transport(_)
        ));
    }

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff_seconds(1), 1);
        assert_eq!(backoff_seconds(2), 2);
        assert_eq!(backoff_seconds(4), 8);
        assert_eq!(backoff_seconds(30), MAX_BACKOFF_SECONDS);
    }

    #[test]
    fn method_url_embeds_token() -> Result<()> {
        let bot = TelegramBot::new(
            "https://api.telegram.org/",
            SecretString::from("123:abc".to_string()),
        )?;
        assert_eq!(
            bot.method_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
        assert!(!format!("{bot:?}").contains("123:abc"));
        Ok(())
    }

    #[test]
    fn token_shape_is_checked() {
        assert!(check_token(&SecretString::from("123:abc".to_string())).is_ok());
        assert!(check_token(&SecretString::from("abc".to_string())).is_err());
        assert!(check_token(&SecretString::from("x1:abc".to_string())).is_err());
        assert!(check_token(&SecretString::from("123:".to_string())).is_err());
    }

    #[test]
    fn updates_become_inbound_messages() -> Result<()> {
        let updates: Vec<Update> = serde_json::from_value(json!([
            {
                "update_id": 10,
                "message": {
                    "chat": {"id": 501},
                    "from": {"username": "bob_tg"},
                    "text": "/start"
                }
            },
            {"update_id": 11, "message": {"chat": {"id": 502}}},
            {"update_id": 12}
        ]))?;

        let inbound: Vec<_> = updates.into_iter().filter_map(Update::into_inbound).collect();
        assert_eq!(
            inbound,
            vec![InboundMessage {
                sender_handle: Some("bob_tg".to_string()),
                chat_id: 501,
                text: "/start".to_string(),
            }]
        );
        Ok(())
    }
}
