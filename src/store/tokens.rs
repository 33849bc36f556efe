use super::snapshot::{self, Snapshot};
use crate::{
    error::{Error, Result},
    identity::UserId,
};
use async_trait::async_trait;
use std::{collections::HashMap, path::PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Bearer token -> owning identity.
///
/// One identity may hold any number of tokens. Tokens never expire and are
/// never revoked; they live as long as the snapshot that carries them.
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: RwLock<HashMap<String, UserId>>,
    path: Option<PathBuf>,
}

impl TokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Returns an error if the snapshot exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let tokens: HashMap<String, UserId> = snapshot::load(&path)?;

        info!(path = %path.display(), tokens = tokens.len(), "token store loaded");

        Ok(Self {
            tokens: RwLock::new(tokens),
            path: Some(path),
        })
    }

    /// Insert or overwrite the owner of `token`.
    pub async fn issue(&self, token: String, owner: UserId) {
        debug!(%owner, "token issued");
        self.tokens.write().await.insert(token, owner);
    }

    /// # Errors
    /// Returns [`Error::NotFound`] for unknown tokens.
    pub async fn resolve_owner(&self, token: &str) -> Result<UserId> {
        self.tokens
            .read()
            .await
            .get(token)
            .copied()
            .ok_or(Error::NotFound)
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

#[async_trait]
impl Snapshot for TokenStore {
    fn name(&self) -> &'static str {
        "tokens"
    }

    async fn dump(&self) -> Result<()> {
        let Some(path) = &self.path else {
            debug!("token store has no snapshot path, skipping dump");
            return Ok(());
        };
        let tokens = self.tokens.read().await.clone();
        snapshot::dump(path, &tokens).await
    }
}
