//! Sign-up, sign-in and profile flows over the credential and token stores.

pub mod password;
pub mod token;

use crate::{
    error::{Error, Result},
    identity::{Identity, Role, UserId, UserInfo},
    store::{CredentialStore, TokenStore},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A freshly minted bearer token and the identity it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "id")]
    pub user_id: UserId,
    pub token: String,
}

/// Orchestrates the credential flows. Holds no state besides the two stores.
#[derive(Debug, Clone)]
pub struct CredentialService {
    users: Arc<CredentialStore>,
    tokens: Arc<TokenStore>,
}

impl CredentialService {
    #[must_use]
    pub fn new(users: Arc<CredentialStore>, tokens: Arc<TokenStore>) -> Self {
        Self { users, tokens }
    }

    #[must_use]
    pub fn users(&self) -> &Arc<CredentialStore> {
        &self.users
    }

    #[must_use]
    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Create an identity with the default role and open its first session.
    ///
    /// The identity is not rolled back if minting the token fails afterwards;
    /// the caller can sign in instead.
    ///
    /// # Errors
    /// Returns [`Error::Conflict`] if the login is taken.
    #[instrument(skip(self, password))]
    pub async fn register(&self, login: &str, password: &str) -> Result<Session> {
        if self.users.lookup_by_login(login).await.is_some() {
            return Err(Error::Conflict(login.to_string()));
        }

        let identity = Identity::new(login.to_string(), password::hash(password)?);
        let id = identity.id;
        self.users.insert_new(identity).await?;

        info!(%id, "identity registered");

        self.open_session(id, login).await
    }

    /// Check a login/password pair and open a new session.
    ///
    /// Earlier sessions of the same identity stay valid.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] for an unknown login and
    /// [`Error::InvalidCredential`] for a wrong password.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<Session> {
        let id = self
            .users
            .lookup_by_login(login)
            .await
            .ok_or(Error::NotFound)?;
        let identity = self.users.get(id).await?;

        if !password::verify(password, &identity.password_hash) {
            debug!(%id, "password mismatch");
            return Err(Error::InvalidCredential);
        }

        info!(%id, "identity authenticated");

        self.open_session(id, &identity.login).await
    }

    /// # Errors
    /// Returns [`Error::NotFound`] if the identity does not exist.
    pub async fn update_profile(&self, id: UserId, name: &str) -> Result<()> {
        self.users
            .modify(id, |identity| identity.name = name.to_string())
            .await
    }

    /// # Errors
    /// Returns [`Error::NotFound`] if the identity does not exist.
    #[instrument(skip(self, new_password))]
    pub async fn change_password(&self, id: UserId, new_password: &str) -> Result<()> {
        let hash = password::hash(new_password)?;
        self.users
            .modify(id, |identity| identity.password_hash = hash)
            .await?;
        info!(%id, "password changed");
        Ok(())
    }

    /// Bind `handle` to the identity. The handle is not checked against the
    /// messaging system.
    ///
    /// Switching to a different handle forgets the known chat destination and
    /// any pending code, since both belong to the previous chat.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if the identity does not exist.
    pub async fn link_chat_handle(&self, id: UserId, handle: &str) -> Result<()> {
        self.users
            .modify(id, |identity| {
                if identity.linked_handle() != Some(handle) {
                    identity.chat_handle = Some(handle.to_string());
                    identity.chat_id = None;
                    identity.pending_code = None;
                }
            })
            .await?;
        info!(%id, %handle, "chat handle linked");
        Ok(())
    }

    /// Record the chat destination id learned from the messaging handshake.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if the identity does not exist.
    pub async fn bind_chat_destination(&self, id: UserId, chat_id: i64) -> Result<()> {
        self.users
            .modify(id, |identity| identity.chat_id = Some(chat_id))
            .await?;
        info!(%id, chat_id, "chat destination bound");
        Ok(())
    }

    /// # Errors
    /// Returns [`Error::NotFound`] for unknown tokens.
    pub async fn resolve_session(&self, token: &str) -> Result<UserId> {
        self.tokens.resolve_owner(token).await
    }

    /// # Errors
    /// Returns [`Error::NotFound`] if the identity does not exist.
    pub async fn user_info(&self, id: UserId) -> Result<UserInfo> {
        Ok(self.users.get(id).await?.info())
    }

    /// # Errors
    /// Returns [`Error::NotFound`] if the identity does not exist.
    pub async fn full_info(&self, id: UserId) -> Result<Identity> {
        self.users.get(id).await
    }

    /// # Errors
    /// Returns [`Error::NotFound`] if the identity does not exist.
    pub async fn is_admin(&self, id: UserId) -> Result<bool> {
        Ok(self.users.get(id).await?.role == Role::Admin)
    }

    /// Mint a token for `id` and record it in the token store.
    pub(crate) async fn open_session(&self, id: UserId, login: &str) -> Result<Session> {
        let token = token::mint(login)?;
        self.tokens.issue(token.clone(), id).await;
        Ok(Session { user_id: id, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> CredentialService {
        CredentialService::new(
            Arc::new(CredentialStore::new()),
            Arc::new(TokenStore::new()),
        )
    }

    #[tokio::test]
    async fn register_creates_default_role_identity() -> anyhow::Result<()> {
        let service = service();
        let session = service.register("alice", "pw1").await?;

        let identity = service.full_info(session.user_id).await?;
        assert_eq!(identity.login, "alice");
        assert_eq!(identity.role, Role::User);
        assert_ne!(identity.password_hash, "pw1");
        assert_eq!(service.resolve_session(&session.token).await?, session.user_id);
        assert!(!service.is_admin(session.user_id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn authenticate_unknown_login_is_not_found() {
        let service = service();
        assert!(matches!(
            service.authenticate("ghost", "pw").await,
            Err(Error::NotFound)
        ));
    }

    #[tokio::test]
    async fn profile_and_password_updates() -> anyhow::Result<()> {
        let service = service();
        let session = service.register("alice", "pw1").await?;

        service.update_profile(session.user_id, "Alice").await?;
        assert_eq!(service.user_info(session.user_id).await?.name, "Alice");

        service.change_password(session.user_id, "pw2").await?;
        assert!(matches!(
            service.authenticate("alice", "pw1").await,
            Err(Error::InvalidCredential)
        ));
        assert_eq!(
            service.authenticate("alice", "pw2").await?.user_id,
            session.user_id
        );

        let unknown = UserId::new();
        assert!(service.update_profile(unknown, "x").await.is_err());
        assert!(service.change_password(unknown, "x").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn relinking_a_new_handle_resets_destination() -> anyhow::Result<()> {
        let service = service();
        let session = service.register("alice", "pw1").await?;
        let id = session.user_id;

        service.link_chat_handle(id, "alice_tg").await?;
        service.bind_chat_destination(id, 42).await?;

        service.link_chat_handle(id, "alice_tg").await?;
        assert_eq!(service.user_info(id).await?.chat_id, 42);

        service.link_chat_handle(id, "alice_new").await?;
        let info = service.user_info(id).await?;
        assert_eq!(info.chat_handle, "alice_new");
        assert_eq!(info.chat_id, 0);
        Ok(())
    }
}
