//! Identity records and the identifiers that key them.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Opaque, immutable identity identifier. Rendered as 32 lowercase hex chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(Uuid);

impl UserId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Role assigned at sign-up.
    #[default]
    User,
    Admin,
}

/// A confirmation code together with the unix second it was issued.
///
/// Both halves are stored and cleared together, so a code can never exist
/// without its timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCode {
    pub code: String,
    pub issued_at: i64,
}

impl PendingCode {
    #[must_use]
    pub fn new(code: String, issued_at: i64) -> Self {
        Self { code, issued_at }
    }

    /// True when `submitted` matches and no more than `window_seconds` have
    /// passed since issuance.
    #[must_use]
    pub fn accepts(&self, submitted: &str, now: i64, window_seconds: i64) -> bool {
        let matches: bool = self.code.as_bytes().ct_eq(submitted.as_bytes()).into();
        matches && self.issued_at > 0 && now.saturating_sub(self.issued_at) <= window_seconds
    }
}

/// One registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub login: String,
    pub password_hash: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_code: Option<PendingCode>,
}

impl Identity {
    #[must_use]
    pub fn new(login: String, password_hash: String) -> Self {
        Self {
            id: UserId::new(),
            login,
            password_hash,
            name: String::new(),
            role: Role::User,
            chat_handle: None,
            chat_id: None,
            pending_code: None,
        }
    }

    /// Linked chat handle, treating an empty string as unlinked.
    #[must_use]
    pub fn linked_handle(&self) -> Option<&str> {
        self.chat_handle.as_deref().filter(|handle| !handle.is_empty())
    }

    #[must_use]
    pub fn link_state(&self) -> LinkState {
        match (self.linked_handle(), self.chat_id) {
            (None, _) => LinkState::Unlinked,
            (Some(_), None | Some(0)) => LinkState::LinkPending,
            (Some(_), Some(_)) => LinkState::Linked,
        }
    }

    #[must_use]
    pub fn info(&self) -> UserInfo {
        UserInfo {
            id: self.id,
            name: self.name.clone(),
            chat_handle: self.chat_handle.clone().unwrap_or_default(),
            chat_id: self.chat_id.unwrap_or_default(),
        }
    }
}

/// Chat linkage of an identity, derived from its handle and destination id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Unlinked,
    LinkPending,
    Linked,
}

/// Short profile view returned to the identity owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: UserId,
    pub name: String,
    pub chat_handle: String,
    pub chat_id: i64,
}
