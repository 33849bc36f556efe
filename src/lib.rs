//! # tgauth (credentials, sessions and Telegram login codes)
//!
//! `tgauth` issues and validates user credentials and opaque bearer tokens, and
//! offers an out-of-band login: a 4-digit code delivered through a Telegram bot
//! and confirmed within a bounded window.
//!
//! ## Stores
//!
//! Identities and tokens live in memory behind one reader/writer lock per store.
//! The credential store keeps two derived indexes (by login and by linked chat
//! handle) and updates them under the same exclusive lock as the identity map,
//! so readers never observe an identity without its index entries.
//!
//! ## Persistence
//!
//! Each store is loaded from a JSON snapshot at startup (a missing file means an
//! empty store, a malformed one aborts startup) and written back once when the
//! process receives a shutdown signal. There is no write-ahead log.
//!
//! ## Chat login
//!
//! A user links a chat handle, then sends `/start` to the bot so the chat
//! destination id becomes known. From then on a code can be requested and
//! confirmed. Codes are single-use and expire lazily: they are only checked at
//! confirmation time, never swept.

pub mod api;
pub mod chat;
pub mod cli;
pub mod error;
pub mod identity;
pub mod service;
pub mod store;

pub use error::{Error, ErrorKind};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
