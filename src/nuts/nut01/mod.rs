//! NUT-01: Mint public key exchange
//!
//! <https://github.com/cashubtc/nuts/blob/main/01.md>

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

mod public_key;
mod secret_key;

pub use public_key::PublicKey;
pub use secret_key::SecretKey;

use crate::Amount;

/// NUT-01 errors
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid public key size
    #[error("invalid public key length, expected {expected} bytes, found {found}")]
    InvalidPublicKeySize {
        /// Expected byte length
        expected: usize,
        /// Found byte length
        found: usize,
    },
    /// secp256k1 error
    #[error(transparent)]
    Secp256k1(#[from] bitcoin::secp256k1::Error),
}

/// A keyset's amount → public key mapping, as published by a mint for one
/// (mint, unit) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keys(BTreeMap<Amount, PublicKey>);

impl Keys {
    /// Wrap an existing map
    pub fn new(keys: BTreeMap<Amount, PublicKey>) -> Self {
        Self(keys)
    }

    /// Underlying map
    pub fn keys(&self) -> &BTreeMap<Amount, PublicKey> {
        &self.0
    }

    /// Look up the public key for a denomination
    pub fn amount_key(&self, amount: Amount) -> Option<&PublicKey> {
        self.0.get(&amount)
    }

    /// Iterate `(amount, pubkey)` pairs in ascending amount order
    pub fn iter(&self) -> impl Iterator<Item = (&Amount, &PublicKey)> {
        self.0.iter()
    }
}

/// Response body for `GET /v1/keys[/<id>]`: a list of keysets, each with
/// their full key map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeysResponse {
    /// Keysets
    pub keysets: Vec<crate::nuts::nut02::KeySet>,
}

impl<'de> Deserialize<'de> for KeysResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Repr {
            keysets: Vec<serde_json::Value>,
        }

        let repr = Repr::deserialize(deserializer)?;
        // Mints occasionally advertise keysets for units or NUT revisions
        // this wallet doesn't understand; skip those rather than failing
        // the whole response.
        let keysets = repr
            .keysets
            .into_iter()
            .flat_map(|value| serde_json::from_value(value).ok())
            .collect();

        Ok(Self { keysets })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_amount_key_lookup() {
        let mut map = BTreeMap::new();
        let pk = PublicKey::from_hex(
            "02194603ffa36356f4a56b7df9371fc3192472351453ec7398b8da8117e7c3e104",
        )
        .unwrap();
        map.insert(Amount::from(1), pk);
        let keys = Keys::new(map);
        assert_eq!(keys.amount_key(Amount::from(1)), Some(&pk));
        assert_eq!(keys.amount_key(Amount::from(2)), None);
    }

    #[test]
    fn test_keys_response_skips_unparseable_keysets() {
        let json = serde_json::json!({
            "keysets": [
                { "id": "not-a-valid-id", "unit": "sat", "keys": {} },
            ]
        });
        let response: KeysResponse = serde_json::from_value(json).unwrap();
        assert!(response.keysets.is_empty());
    }
}
