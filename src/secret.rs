// Random generation originally adapted from
// https://github.com/clarkmoody/cashu-rs/blob/master/src/secret.rs

//! The secret committed to by a [`crate::nuts::nut00::Proof`]: either an
//! opaque random string or a JSON-encoded well-known spending condition
//! (NUT-10).

use std::str::FromStr;

use bitcoin::base64::engine::general_purpose::URL_SAFE;
use bitcoin::base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Secret errors
#[derive(Debug, Error)]
pub enum Error {
    /// Secret is empty
    #[error("Secret is empty")]
    Empty,
    /// Invalid hex encoding
    #[error(transparent)]
    Hex(#[from] bitcoin::hex::HexToBytesError),
    /// Underlying utf8 string was not valid JSON when a well-known
    /// secret was expected
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// The secret data that allows spending ecash
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Default for Secret {
    fn default() -> Self {
        Self::generate()
    }
}

impl Secret {
    const RANDOM_BYTE_LENGTH: usize = 32;

    /// Wrap an existing string as a [`Secret`] without validation; used when
    /// constructing a secret from caller-supplied or already-parsed data.
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self(secret.into())
    }

    /// Generate a fresh random secret: 32 random bytes, hex-encoded, as used
    /// for plain (non spending-condition) proofs.
    pub fn generate() -> Self {
        use rand::RngCore;

        use bitcoin::hex::DisplayHex;

        let mut rng = rand::rng();
        let mut random_bytes = [0u8; Self::RANDOM_BYTE_LENGTH];
        rng.fill_bytes(&mut random_bytes);
        Self(random_bytes.to_lower_hex_string())
    }

    /// Generate a random nonce suitable for a NUT-10 `SecretData.nonce`
    /// field; historically base64 in the reference implementation, kept
    /// here for bit-compatibility with that field's existing usage.
    pub fn generate_nonce() -> String {
        use rand::RngCore;

        let mut rng = rand::rng();
        let mut random_bytes = [0u8; 16];
        rng.fill_bytes(&mut random_bytes);
        URL_SAFE.encode(random_bytes)
    }

    /// Raw UTF-8 bytes of the secret string, the message hashed by
    /// `hash_to_curve`.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Owned byte vector
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }

    /// Underlying string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

use std::fmt;

impl FromStr for Secret {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::Empty);
        }
        Ok(Self(s.to_string()))
    }
}

impl AsRef<str> for Secret {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        let a = Secret::generate();
        let b = Secret::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_bytes().len(), 64);
    }

    #[test]
    fn test_from_str_rejects_empty() {
        assert!(Secret::from_str("").is_err());
        assert!(Secret::from_str("abc").is_ok());
    }
}
