//! Confirmation-code state machine.
//!
//! Per identity: Unlinked (no handle) -> LinkPending (handle, no chat id) ->
//! Linked (chat id known). Only Linked identities can receive codes. The code
//! and its issuance time live on the identity itself, so issuing, checking and
//! clearing a code all go through the credential store's single write lock.

use super::{DeliveryError, InboundMessage, Messenger};
use crate::{
    error::{Error, Result},
    identity::PendingCode,
    service::{CredentialService, Session},
};
use rand::Rng;
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, info, instrument, warn};

const DEFAULT_CODE_EXPIRY_SECONDS: i64 = 5 * 60;
const CODE_DIGITS: usize = 4;

pub(crate) const START_COMMAND: &str = "/start";
pub(crate) const REPLY_WELCOME: &str = "Welcome! Your chat is now linked.";
pub(crate) const REPLY_NOT_LINKED: &str = "Your account is not linked.";
pub(crate) const REPLY_ALREADY_LINKED: &str = "Your account is already linked.";
pub(crate) const REPLY_BIND_FAILED: &str = "Could not link this chat, try again.";

#[derive(Clone, Copy, Debug)]
pub struct ChatLoginConfig {
    code_expiry_seconds: i64,
}

impl ChatLoginConfig {
    /// Codes expire 300 seconds after issuance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            code_expiry_seconds: DEFAULT_CODE_EXPIRY_SECONDS,
        }
    }

    #[must_use]
    pub fn with_code_expiry_seconds(mut self, seconds: i64) -> Self {
        self.code_expiry_seconds = seconds;
        self
    }

    #[must_use]
    pub fn code_expiry_seconds(&self) -> i64 {
        self.code_expiry_seconds
    }
}

impl Default for ChatLoginConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct ChatLogin {
    service: CredentialService,
    messenger: Arc<dyn Messenger>,
    config: ChatLoginConfig,
}

impl ChatLogin {
    #[must_use]
    pub fn new(
        service: CredentialService,
        messenger: Arc<dyn Messenger>,
        config: ChatLoginConfig,
    ) -> Self {
        Self {
            service,
            messenger,
            config,
        }
    }

    /// Send a fresh code to the chat linked to `handle` and remember it.
    ///
    /// The code is stored only after delivery succeeds, replacing any earlier
    /// pending code, and only if the identity still has the handle and chat it
    /// was delivered to.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if no identity has this handle,
    /// [`Error::DeliveryUnavailable`] if the chat destination is not known yet,
    /// and [`Error::Delivery`] for any other transport failure.
    #[instrument(skip(self))]
    pub async fn request_code(&self, handle: &str) -> Result<()> {
        let identity = self.service.users().lookup_by_chat_handle(handle).await?;

        let chat_id = match identity.chat_id {
            Some(chat_id) if chat_id != 0 => chat_id,
            _ => {
                debug!(id = %identity.id, "no chat destination bound");
                return Err(Error::DeliveryUnavailable);
            }
        };

        let code = generate_code();

        self.messenger
            .deliver_text(chat_id, &format!("Your login code: {code}"))
            .await
            .map_err(|err| {
                warn!(id = %identity.id, chat_id, "code delivery failed: {err}");
                match err {
                    DeliveryError::DestinationEmpty => Error::DeliveryUnavailable,
                    DeliveryError::Transport(reason) => Error::Delivery(reason),
                }
            })?;

        let issued_at = unix_now();
        let stored = self
            .service
            .users()
            .modify(identity.id, |current| {
                let unchanged =
                    current.linked_handle() == Some(handle) && current.chat_id == Some(chat_id);
                if unchanged {
                    current.pending_code = Some(PendingCode::new(code, issued_at));
                }
                unchanged
            })
            .await?;

        if !stored {
            warn!(id = %identity.id, "chat link changed during delivery, code dropped");
            return Err(Error::DeliveryUnavailable);
        }

        info!(id = %identity.id, "login code issued");

        Ok(())
    }

    /// Exchange a pending code for a new session.
    ///
    /// A matching, unexpired code is cleared in the same store write that
    /// checks it, so it can be used once.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if no identity has this handle and
    /// [`Error::InvalidOrExpiredCode`] if the code is wrong, expired or absent.
    #[instrument(skip(self, submitted))]
    pub async fn confirm_code(&self, handle: &str, submitted: &str) -> Result<Session> {
        let identity = self.service.users().lookup_by_chat_handle(handle).await?;

        let now = unix_now();
        let window = self.config.code_expiry_seconds;

        let accepted = self
            .service
            .users()
            .modify(identity.id, |identity| {
                let accepted = identity
                    .pending_code
                    .as_ref()
                    .is_some_and(|pending| pending.accepts(submitted, now, window));
                if accepted {
                    identity.pending_code = None;
                }
                accepted
            })
            .await?;

        if !accepted {
            debug!(id = %identity.id, "code rejected");
            return Err(Error::InvalidOrExpiredCode);
        }

        info!(id = %identity.id, "login code confirmed");

        self.service.open_session(identity.id, &identity.login).await
    }

    /// Answer one inbound chat message, completing the `/start` handshake.
    ///
    /// Returns the reply text for the sender's chat.
    pub async fn handle_inbound(&self, message: &InboundMessage) -> String {
        let identity = match message.sender_handle.as_deref() {
            Some(handle) => self.service.users().lookup_by_chat_handle(handle).await,
            None => Err(Error::NotFound),
        };

        if message.text.trim() == START_COMMAND {
            let Ok(identity) = identity else {
                debug!(chat_id = message.chat_id, "start from unlinked handle");
                return REPLY_NOT_LINKED.to_string();
            };

            return match self
                .service
                .bind_chat_destination(identity.id, message.chat_id)
                .await
            {
                Ok(()) => REPLY_WELCOME.to_string(),
                Err(err) => {
                    warn!(id = %identity.id, "failed to bind chat destination: {err}");
                    REPLY_BIND_FAILED.to_string()
                }
            };
        }

        match identity {
            Ok(identity) if identity.chat_id.is_some_and(|chat_id| chat_id != 0) => {
                REPLY_ALREADY_LINKED.to_string()
            }
            _ => REPLY_NOT_LINKED.to_string(),
        }
    }
}

/// Uniform over 0000-9999, leading zeros kept.
fn generate_code() -> String {
    let value = rand::thread_rng().gen_range(0..10_u32.pow(CODE_DIGITS as u32));
    format!("{value:0width$}", width = CODE_DIGITS)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}
