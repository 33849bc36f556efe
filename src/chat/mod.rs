//! Out-of-band login through a chat bot.
//!
//! The messaging transport is reduced to the [`Messenger`] capability ("send
//! text to chat id C") plus a feed of [`InboundMessage`]s used only for the
//! `/start` handshake that teaches us a handle's chat destination id.
//!
//! The default sender for local dev is [`LogMessenger`], which logs and returns
//! `Ok(())`; [`telegram::TelegramBot`] talks to the Telegram Bot API.

pub mod login;
pub mod telegram;

pub use login::{ChatLogin, ChatLoginConfig};

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The transport has no chat to deliver to (the user never sent `/start`).
    #[error("chat destination is empty")]
    DestinationEmpty,
    #[error("{0}")]
    Transport(String),
}

/// Outbound side of the messaging transport.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Deliver `text` to `chat_id`.
    async fn deliver_text(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError>;
}

/// Local dev messenger that logs the text instead of sending it.
#[derive(Clone, Debug)]
pub struct LogMessenger;

#[async_trait]
impl Messenger for LogMessenger {
    async fn deliver_text(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError> {
        if chat_id == 0 {
            return Err(DeliveryError::DestinationEmpty);
        }
        info!(chat_id, %text, "chat message send stub");
        Ok(())
    }
}

/// One text message received by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender's chat handle, if the transport exposes one.
    pub sender_handle: Option<String>,
    pub chat_id: i64,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_messenger_rejects_zero_destination() {
        assert_eq!(
            LogMessenger.deliver_text(0, "hi").await,
            Err(DeliveryError::DestinationEmpty)
        );
        assert_eq!(LogMessenger.deliver_text(5, "hi").await, Ok(()));
    }
}
