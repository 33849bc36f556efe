use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the stores, the credential service and the chat login flow.
///
/// Every variant is a value handed back to the immediate caller. Only
/// [`Error::PersistenceCorrupt`] and [`Error::PersistenceRead`] at startup are
/// meant to stop the process.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not found")]
    NotFound,
    #[error("login {0} already exists")]
    Conflict(String),
    #[error("wrong login or password")]
    InvalidCredential,
    #[error("invalid or expired code")]
    InvalidOrExpiredCode,
    #[error("chat destination is not bound, send /start to the bot first")]
    DeliveryUnavailable,
    #[error("message delivery failed: {0}")]
    Delivery(String),
    #[error("snapshot {} is corrupt: {source}", path.display())]
    PersistenceCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read snapshot {}: {source}", path.display())]
    PersistenceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write snapshot {}: {source}", path.display())]
    PersistenceWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to gather randomness: {0}")]
    Entropy(String),
}

/// Caller-facing classification of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidCredential,
    DeliveryUnavailable,
    Delivery,
    PersistenceCorrupt,
    PersistenceWriteFailed,
    Internal,
}

impl Error {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::InvalidCredential | Self::InvalidOrExpiredCode => ErrorKind::InvalidCredential,
            Self::DeliveryUnavailable => ErrorKind::DeliveryUnavailable,
            Self::Delivery(_) => ErrorKind::Delivery,
            Self::PersistenceCorrupt { .. } | Self::PersistenceRead { .. } => {
                ErrorKind::PersistenceCorrupt
            }
            Self::PersistenceWriteFailed { .. } => ErrorKind::PersistenceWriteFailed,
            Self::Entropy(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
