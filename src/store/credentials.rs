//! In-memory identity store with login and chat-handle indexes.

use super::snapshot::{self, Snapshot};
use crate::{
    error::{Error, Result},
    identity::{Identity, UserId},
};
use async_trait::async_trait;
use std::{collections::HashMap, path::PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<UserId, Identity>,
    by_login: HashMap<String, UserId>,
    by_handle: HashMap<String, UserId>,
}

impl Inner {
    fn from_users(users: HashMap<UserId, Identity>) -> Self {
        let mut inner = Self {
            users,
            ..Self::default()
        };

        for identity in inner.users.values() {
            inner.by_login.insert(identity.login.clone(), identity.id);
            if let Some(handle) = identity.linked_handle() {
                if let Some(previous) = inner.by_handle.insert(handle.to_string(), identity.id) {
                    warn!(%handle, %previous, current = %identity.id, "chat handle bound twice in snapshot");
                }
            }
        }

        inner
    }

    /// Store `identity` and re-derive both index entries for it.
    fn apply(&mut self, identity: Identity) {
        let id = identity.id;

        self.by_handle.retain(|_, owner| *owner != id);

        if let Some(previous) = self.users.get(&id) {
            if previous.login != identity.login && self.by_login.get(&previous.login) == Some(&id) {
                self.by_login.remove(&previous.login);
            }
        }

        if let Some(handle) = identity.linked_handle() {
            if let Some(evicted) = self
                .by_handle
                .insert(handle.to_string(), id)
                .filter(|owner| *owner != id)
            {
                if let Some(other) = self.users.get_mut(&evicted) {
                    other.chat_handle = None;
                    other.chat_id = None;
                    other.pending_code = None;
                }
                info!(%handle, from = %evicted, to = %id, "chat handle rebound");
            }
        }

        self.by_login.insert(identity.login.clone(), id);
        self.users.insert(id, identity);
    }
}

/// Authoritative owner of all identities.
///
/// One reader/writer lock guards the identity map and both indexes, and every
/// write holds it across the whole multi-index update.
#[derive(Debug, Default)]
pub struct CredentialStore {
    inner: RwLock<Inner>,
    path: Option<PathBuf>,
}

impl CredentialStore {
    /// Empty store that is never persisted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the store from the snapshot at `path` and rebuild the indexes.
    ///
    /// # Errors
    /// Returns an error if the snapshot exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let users: HashMap<UserId, Identity> = snapshot::load(&path)?;

        info!(path = %path.display(), users = users.len(), "credential store loaded");

        Ok(Self {
            inner: RwLock::new(Inner::from_users(users)),
            path: Some(path),
        })
    }

    pub async fn lookup_by_login(&self, login: &str) -> Option<UserId> {
        self.inner.read().await.by_login.get(login).copied()
    }

    /// # Errors
    /// Returns [`Error::NotFound`] if no identity has this id.
    pub async fn get(&self, id: UserId) -> Result<Identity> {
        self.inner
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    /// # Errors
    /// Returns [`Error::NotFound`] if the handle is not linked to any identity.
    pub async fn lookup_by_chat_handle(&self, handle: &str) -> Result<Identity> {
        let inner = self.inner.read().await;
        inner
            .by_handle
            .get(handle)
            .and_then(|id| inner.users.get(id))
            .cloned()
            .ok_or(Error::NotFound)
    }

    /// Replace the stored identity with the same id (or add it) and re-derive
    /// its login and chat-handle index entries.
    ///
    /// Binding a handle that another identity holds unlinks that identity.
    pub async fn upsert(&self, identity: Identity) {
        debug!(id = %identity.id, "upsert identity");
        self.inner.write().await.apply(identity);
    }

    /// Insert a new identity unless its login is already taken.
    ///
    /// # Errors
    /// Returns [`Error::Conflict`] if the login is indexed already.
    pub async fn insert_new(&self, identity: Identity) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.by_login.contains_key(&identity.login) {
            return Err(Error::Conflict(identity.login));
        }
        inner.apply(identity);
        Ok(())
    }

    /// Read-modify-write one identity under a single exclusive lock.
    ///
    /// `f` edits a copy; the copy is then applied exactly like [`Self::upsert`].
    /// The id is restored if `f` changes it.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if no identity has this id.
    pub async fn modify<F, T>(&self, id: UserId, f: F) -> Result<T>
    where
        F: FnOnce(&mut Identity) -> T,
    {
        let mut inner = self.inner.write().await;
        let mut identity = inner.users.get(&id).cloned().ok_or(Error::NotFound)?;
        let out = f(&mut identity);
        identity.id = id;
        inner.apply(identity);
        Ok(out)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.users.is_empty()
    }
}

#[async_trait]
impl Snapshot for CredentialStore {
    fn name(&self) -> &'static str {
        "users"
    }

    async fn dump(&self) -> Result<()> {
        let Some(path) = &self.path else {
            debug!("credential store has no snapshot path, skipping dump");
            return Ok(());
        };
        let users = self.inner.read().await.users.clone();
        snapshot::dump(path, &users).await
    }
}
