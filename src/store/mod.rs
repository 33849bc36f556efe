//! Shared in-memory stores and their snapshot persistence.

pub mod credentials;
pub mod snapshot;
pub mod tokens;

pub use credentials::CredentialStore;
pub use snapshot::{dump_on_shutdown, Snapshot};
pub use tokens::TokenStore;

use crate::error::Result;
use std::path::Path;

pub const USERS_SNAPSHOT: &str = "users.json";
pub const TOKENS_SNAPSHOT: &str = "tokens.json";

/// Open both stores from their snapshots under `data_dir`.
///
/// # Errors
/// Returns an error if either snapshot is unreadable or malformed.
pub fn open(data_dir: &Path) -> Result<(CredentialStore, TokenStore)> {
    let users = CredentialStore::open(data_dir.join(USERS_SNAPSHOT))?;
    let tokens = TokenStore::open(data_dir.join(TOKENS_SNAPSHOT))?;
    Ok((users, tokens))
}
