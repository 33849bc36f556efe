//! Bearer token minting.
//!
//! A token is two hex halves joined: a digest of the current time (plus a random
//! nonce, so tokens minted in the same instant still differ) and a digest of the
//! login. Callers must treat the result as opaque.

use crate::error::{Error, Result};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

const HALF_HEX_LEN: usize = 32;
pub const TOKEN_LEN: usize = HALF_HEX_LEN * 2;

/// # Errors
/// Returns [`Error::Entropy`] if the OS random source fails.
pub fn mint(login: &str) -> Result<String> {
    let mut nonce = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|err| Error::Entropy(err.to_string()))?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();

    let mut time_hasher = Sha256::new();
    time_hasher.update(now.to_string().as_bytes());
    time_hasher.update(nonce);
    let time_part = hex::encode(time_hasher.finalize());

    let login_part = hex::encode(Sha256::digest(login.as_bytes()));

    Ok(format!(
        "{}{}",
        &time_part[..HALF_HEX_LEN],
        &login_part[..HALF_HEX_LEN]
    ))
}
