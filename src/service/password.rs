//! Salted, iterated SHA-256 password hashes compared in constant time.
//!
//! Stored form: `<base64 salt>$<hex digest>`.

use crate::error::{Error, Result};
use base64ct::{Base64, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const SALT_BYTES: usize = 16;
const HASH_ITERATIONS: u32 = 10_000;

/// Hash `password` under a fresh random salt.
///
/// # Errors
/// Returns [`Error::Entropy`] if the OS random source fails.
pub fn hash(password: &str) -> Result<String> {
    let mut salt = [0u8; SALT_BYTES];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|err| Error::Entropy(err.to_string()))?;
    Ok(format!(
        "{}${}",
        Base64::encode_string(&salt),
        hex::encode(digest(password, &salt))
    ))
}

/// Check `password` against a stored hash. Malformed hashes never verify.
#[must_use]
pub fn verify(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = Base64::decode_vec(salt) else {
        return false;
    };
    let Ok(expected) = hex::decode(expected) else {
        return false;
    };
    let actual = digest(password, &salt);
    actual.as_slice().ct_eq(expected.as_slice()).into()
}

fn digest(password: &str, salt: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let mut out: [u8; 32] = hasher.finalize().into();

    for _ in 1..HASH_ITERATIONS {
        let mut hasher = Sha256::new();
        hasher.update(out);
        hasher.update(salt);
        out = hasher.finalize().into();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() -> anyhow::Result<()> {
        let stored = hash("pw1")?;
        assert!(verify("pw1", &stored));
        assert!(!verify("pw2", &stored));
        Ok(())
    }

    #[test]
    fn same_password_gets_distinct_salts() -> anyhow::Result<()> {
        assert_ne!(hash("pw1")?, hash("pw1")?);
        Ok(())
    }

    #[test]
    fn malformed_hashes_do_not_verify() {
        assert!(!verify("pw", ""));
        assert!(!verify("pw", "no-separator"));
        assert!(!verify("pw", "!!!$00"));
        assert!(!verify("pw", "AAAA$zz"));
    }
}
