//! NUT-02: Keysets and keyset ID
//!
//! <https://github.com/cashubtc/nuts/blob/main/02.md>

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use bitcoin::hashes::{sha256, Hash};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::nut01::Keys;
use crate::Amount;

/// NUT-02 errors
#[derive(Debug, Error)]
pub enum Error {
    /// Id must be exactly [`Id::STRLEN`] hex characters
    #[error("invalid keyset id length")]
    Length,
    /// Id is not valid hex
    #[error(transparent)]
    Hex(#[from] bitcoin::hex::HexToBytesError),
    /// Unknown keyset id version byte
    #[error("unknown keyset id version")]
    UnknownVersion,
}

/// The version byte prefixed to a keyset id, distinguishing the derivation
/// scheme used to compute it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeySetVersion {
    /// SHA256(sorted pubkeys), first 14 hex chars, prefixed `00`.
    Version00,
}

impl KeySetVersion {
    /// Single-byte encoding of this version
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Version00 => 0x00,
        }
    }

    /// Parse a version byte
    pub fn from_byte(byte: u8) -> Result<Self, Error> {
        match byte {
            0x00 => Ok(Self::Version00),
            _ => Err(Error::UnknownVersion),
        }
    }
}

/// A keyset ID: a deterministic identifier for a specific set of mint
/// public keys, stable across recomputation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id {
    version: KeySetVersion,
    body: [u8; Self::BODY_BYTES],
}

impl Id {
    const BODY_BYTES: usize = 7;
    /// Total hex-string length, including the two-character version prefix.
    pub const STRLEN: usize = 16;

    /// Parse an `Id` from its 16-hex-character representation.
    pub fn from_hex(hex: &str) -> Result<Self, Error> {
        if hex.len() != Self::STRLEN {
            return Err(Error::Length);
        }

        let bytes = <Vec<u8> as bitcoin::hex::FromHex>::from_hex(hex)?;
        let version = KeySetVersion::from_byte(bytes[0])?;
        let mut body = [0u8; Self::BODY_BYTES];
        body.copy_from_slice(&bytes[1..]);

        Ok(Self { version, body })
    }

    /// The version this id was derived with
    pub fn version(&self) -> KeySetVersion {
        self.version
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}", self.version.to_byte())?;
        for byte in self.body {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({self})")
    }
}

impl FromStr for Id {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Id {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl Serialize for Id {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Id::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl From<&Keys> for Id {
    fn from(keys: &Keys) -> Self {
        // NUT-02 §2.2.2: sort by amount ascending, concatenate the raw
        // compressed pubkey bytes, SHA256, take the first 14 hex chars
        // (7 bytes), prefix with the current version byte.
        let mut pairs: Vec<_> = keys.iter().collect();
        pairs.sort_by_key(|(amount, _)| **amount);

        let mut concatenated = Vec::with_capacity(pairs.len() * 33);
        for (_, pubkey) in pairs {
            concatenated.extend_from_slice(&pubkey.to_bytes());
        }

        let hash = sha256::Hash::hash(&concatenated).to_byte_array();
        let mut body = [0u8; Self::BODY_BYTES];
        body.copy_from_slice(&hash[..Self::BODY_BYTES]);

        Self {
            version: KeySetVersion::Version00,
            body,
        }
    }
}

impl TryFrom<Id> for u64 {
    type Error = Error;

    /// Interpret the full (version-prefixed) id as a big-endian integer;
    /// used by the deterministic-secret derivation path (NUT-13).
    fn try_from(id: Id) -> Result<Self, Self::Error> {
        let mut bytes = [0u8; 8];
        bytes[0] = id.version.to_byte();
        bytes[1..].copy_from_slice(&id.body);
        Ok(u64::from_be_bytes(bytes))
    }
}

/// Per-keyset metadata advertised by `GET /v1/keysets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySetInfo {
    /// Keyset id
    pub id: Id,
    /// Currency unit
    pub unit: super::nut00::CurrencyUnit,
    /// Whether new outputs may be minted against this keyset
    pub active: bool,
    /// Fee charged per input proof, in parts-per-thousand
    #[serde(default = "default_input_fee_ppk")]
    pub input_fee_ppk: u64,
}

fn default_input_fee_ppk() -> u64 {
    0
}

/// A keyset with its full key map, as returned by `GET /v1/keys[/<id>]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
    /// Keyset id
    pub id: Id,
    /// Currency unit
    pub unit: super::nut00::CurrencyUnit,
    /// Amount → public key map
    pub keys: Keys,
}

/// Response body for `GET /v1/keysets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysetResponse {
    /// Keyset summaries
    pub keysets: Vec<KeySetInfo>,
}

/// Result of reconciling the locally known keysets against a fresh sync
/// from the mint: three disjoint id lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeysetSyncDelta {
    /// Ids seen for the first time
    pub newly_seen: Vec<Id>,
    /// Ids that transitioned from inactive (or unknown) to active
    pub newly_active: Vec<Id>,
    /// Ids that transitioned from active to inactive
    pub newly_inactive: Vec<Id>,
}

/// Reconciles `known` keyset info (the wallet's current view) against
/// `fresh` keyset info (just retrieved from the mint).
pub fn diff_keysets(known: &[KeySetInfo], fresh: &[KeySetInfo]) -> KeysetSyncDelta {
    let known_ids: HashSet<Id> = known.iter().map(|k| k.id).collect();
    let known_active: HashSet<Id> = known.iter().filter(|k| k.active).map(|k| k.id).collect();

    let mut delta = KeysetSyncDelta::default();

    for info in fresh {
        if !known_ids.contains(&info.id) {
            delta.newly_seen.push(info.id);
        }
        if info.active && !known_active.contains(&info.id) {
            delta.newly_active.push(info.id);
        }
        if !info.active && known_active.contains(&info.id) {
            delta.newly_inactive.push(info.id);
        }
    }

    delta
}

#[cfg(feature = "mint")]
/// Mint-side keyset generation, used only by test fixtures that act as a
/// mint to exercise the wallet's consumption of BDHKE/DLEQ.
pub mod mint {
    use std::collections::BTreeMap;

    use super::*;
    use crate::nuts::nut01::SecretKey;

    /// A full (public + private) keyset, generated from a base secret.
    #[derive(Debug, Clone)]
    pub struct MintKeySet {
        /// Derived id
        pub id: Id,
        /// Amount → keypair
        pub keys: BTreeMap<Amount, (SecretKey, crate::nuts::nut01::PublicKey)>,
    }

    impl MintKeySet {
        /// Generate a keyset covering powers of two up to `2^(max_order-1)`
        /// from a raw base secret and derivation path:
        /// `k_i = HASH_SHA256(seed ‖ i)`, retried with the hash re-fed back
        /// in on the (cryptographically negligible) chance it doesn't
        /// reduce to a valid scalar.
        pub fn generate(seed: &[u8], max_order: u8) -> Self {
            let mut keys = BTreeMap::new();

            for i in 0..max_order {
                let amount = Amount::from(1u64 << i);
                let mut material = [seed, &i.to_be_bytes()].concat();
                let sk = loop {
                    let hash = bitcoin::hashes::sha256::Hash::hash(&material).to_byte_array();
                    match bitcoin::secp256k1::SecretKey::from_slice(&hash) {
                        Ok(sk) => break SecretKey::from(sk),
                        Err(_) => material = hash.to_vec(),
                    }
                };

                let pk = sk.public_key();
                keys.insert(amount, (sk, pk));
            }

            let public_map: BTreeMap<Amount, crate::nuts::nut01::PublicKey> =
                keys.iter().map(|(amt, (_, pk))| (*amt, *pk)).collect();
            let id = Id::from(&Keys::new(public_map));

            Self { id, keys }
        }

        /// Public half of this keyset
        pub fn public_keys(&self) -> Keys {
            Keys::new(self.keys.iter().map(|(amt, (_, pk))| (*amt, *pk)).collect())
        }

        /// Private key for a denomination
        pub fn secret_for_amount(&self, amount: Amount) -> Option<&SecretKey> {
            self.keys.get(&amount).map(|(sk, _)| sk)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::nuts::nut01::PublicKey;

    fn test_keys() -> Keys {
        let mut map = std::collections::BTreeMap::new();
        map.insert(
            Amount::from(1),
            PublicKey::from_hex(
                "02194603ffa36356f4a56b7df9371fc3192472351453ec7398b8da8117e7c3e104",
            )
            .unwrap(),
        );
        map.insert(
            Amount::from(2),
            PublicKey::from_hex(
                "03f2b1d2c7b5fcf7e8ad2c6a8a6f0e6a5dfc5a3bcb6b3a2a9c2b1d0a9b8c7d6e5f",
            )
            .unwrap(),
        );
        Keys::new(map)
    }

    #[test]
    fn test_keyset_id_is_versioned_and_stable() {
        let keys = test_keys();
        let id = Id::from(&keys);
        let id_str = id.to_string();

        assert_eq!(id_str.len(), Id::STRLEN);
        assert!(id_str.starts_with("00"));
        assert_eq!(id, Id::from(&keys));
    }

    #[test]
    fn test_keyset_id_changes_with_keys() {
        let keys_a = test_keys();
        let mut other_map = keys_a.keys().clone();
        other_map.insert(
            Amount::from(4),
            PublicKey::from_hex(
                "02aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            )
            .unwrap(),
        );
        let keys_b = Keys::new(other_map);

        assert_ne!(Id::from(&keys_a), Id::from(&keys_b));
    }

    #[test]
    fn test_id_round_trip_and_to_int() {
        let id = Id::from_str("009a1f293253e41e").unwrap();
        assert_eq!(id.to_string(), "009a1f293253e41e");
        assert_eq!(u64::try_from(id).unwrap(), 0x009a1f293253e41e);
    }

    #[test]
    fn test_diff_keysets() {
        let old = vec![KeySetInfo {
            id: Id::from_str("0011111111111111").unwrap(),
            unit: super::super::nut00::CurrencyUnit::Sat,
            active: true,
            input_fee_ppk: 0,
        }];
        let fresh = vec![
            KeySetInfo {
                id: Id::from_str("0011111111111111").unwrap(),
                unit: super::super::nut00::CurrencyUnit::Sat,
                active: false,
                input_fee_ppk: 0,
            },
            KeySetInfo {
                id: Id::from_str("0022222222222222").unwrap(),
                unit: super::super::nut00::CurrencyUnit::Sat,
                active: true,
                input_fee_ppk: 0,
            },
        ];

        let delta = diff_keysets(&old, &fresh);
        assert_eq!(delta.newly_seen, vec![Id::from_str("0022222222222222").unwrap()]);
        assert_eq!(delta.newly_active, vec![Id::from_str("0022222222222222").unwrap()]);
        assert_eq!(
            delta.newly_inactive,
            vec![Id::from_str("0011111111111111").unwrap()]
        );
    }
}
