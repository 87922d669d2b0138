//! NUT-00: Notation and Models
//!
//! <https://github.com/cashubtc/nuts/blob/main/00.md>

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod token;
pub use token::{Token, TokenV3, TokenV4};

use crate::dhke::hash_to_curve;
use crate::nuts::nut01::PublicKey;
#[cfg(feature = "wallet")]
use crate::nuts::nut01::SecretKey;
use crate::nuts::nut02::Id;
use crate::nuts::nut11::P2PKWitness;
use crate::nuts::nut12::{BlindSignatureDleq, ProofDleq};
use crate::nuts::nut14::HTLCWitness;
use crate::secret::Secret;
use crate::Amount;

/// NUT00 errors
#[derive(Debug, Error)]
pub enum Error {
    /// Amount error
    #[error(transparent)]
    Amount(#[from] crate::amount::Error),
    /// DHKE error
    #[error(transparent)]
    Dhke(#[from] crate::dhke::Error),
    /// Secret error
    #[error(transparent)]
    Secret(#[from] crate::secret::Error),
    /// A point did not parse as a valid secp256k1 public key
    #[error("invalid proof signature point")]
    InvalidPoint,
    /// Serde Json error
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
    /// Ciborium deserialization error
    #[error(transparent)]
    CiboriumError(#[from] ciborium::de::Error<std::io::Error>),
    /// Ciborium serialization error
    #[error(transparent)]
    CiboriumSerError(#[from] ciborium::ser::Error<std::io::Error>),
    /// Base64 error
    #[error(transparent)]
    Base64Error(#[from] bitcoin::base64::DecodeError),
    /// Utf8 parse error
    #[error(transparent)]
    Utf8ParseError(#[from] std::string::FromUtf8Error),
    /// Proofs required
    #[error("token must contain at least one proof")]
    ProofsRequired,
    /// Unsupported token prefix/version
    #[error("unsupported token version")]
    UnsupportedToken,
    /// Unknown `cashuA`/`cashuB` prefix
    #[error("unknown token prefix")]
    UnknownTokenVersion,
}

/// Currency unit
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyUnit {
    /// Satoshi
    #[default]
    Sat,
    /// Millisatoshi
    Msat,
    /// US Dollar
    Usd,
    /// Tether
    Usdt,
    /// Any other unit the mint advertises, kept opaque.
    #[serde(untagged)]
    Custom(String),
}

impl fmt::Display for CurrencyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sat => write!(f, "sat"),
            Self::Msat => write!(f, "msat"),
            Self::Usd => write!(f, "usd"),
            Self::Usdt => write!(f, "usdt"),
            Self::Custom(s) => write!(f, "{s}"),
        }
    }
}

/// Payment method advertised by a mint (NUT-04/05); carried here only as an
/// opaque echo field on quotes, since settlement itself is out of scope.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// BOLT11 Lightning invoice
    #[default]
    Bolt11,
    /// BOLT12 Lightning offer
    Bolt12,
    /// Mint-specific custom method
    #[serde(untagged)]
    Custom(String),
}

/// Witness data proving a spending condition is satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Witness {
    /// P2PK signatures
    P2PKWitness(P2PKWitness),
    /// HTLC preimage + signatures
    HTLCWitness(HTLCWitness),
}

impl Witness {
    /// Signatures carried by either witness kind
    pub fn signatures(&self) -> Option<Vec<String>> {
        match self {
            Self::P2PKWitness(w) => Some(w.signatures.clone()),
            Self::HTLCWitness(w) => w.signatures.clone(),
        }
    }

    /// Append signatures, creating the signature list if this is a fresh
    /// HTLC witness that doesn't have one yet.
    pub fn add_signatures(&mut self, signatures: Vec<String>) {
        match self {
            Self::P2PKWitness(w) => w.signatures.extend(signatures),
            Self::HTLCWitness(w) => w.signatures.get_or_insert_with(Vec::new).extend(signatures),
        }
    }
}

/// A blinded message submitted to a mint for signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindedMessage {
    /// Requested denomination
    pub amount: Amount,
    /// Keyset the output will belong to
    #[serde(rename = "id")]
    pub keyset_id: Id,
    /// Blinded secret point `B_`
    #[serde(rename = "B_")]
    pub blinded_secret: PublicKey,
    /// Spending-condition witness data, if the output commits to one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<String>,
}

/// A mint's blind signature over a [`BlindedMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindSignature {
    /// Denomination signed for
    pub amount: Amount,
    /// Keyset used to sign
    #[serde(rename = "id")]
    pub keyset_id: Id,
    /// Blinded signature point `C_`
    #[serde(rename = "C_")]
    pub c: PublicKey,
    /// Optional DLEQ proof binding this signature to the keyset's key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dleq: Option<BlindSignatureDleq>,
}

/// An unblinded, mint-signed bearer note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Denomination
    pub amount: Amount,
    /// Keyset id
    #[serde(rename = "id")]
    pub keyset_id: Id,
    /// The secret this proof commits to
    pub secret: Secret,
    /// Unblinded signature
    #[serde(rename = "C")]
    pub c: PublicKey,
    /// Spending-condition witness, JSON-encoded per NUT-11/NUT-14
    #[serde(default, skip_serializing_if = "Option::is_none", with = "witness_serde")]
    pub witness: Option<Witness>,
    /// DLEQ proof, present when the mint supports NUT-12
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dleq: Option<ProofDleq>,
}

mod witness_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Witness;

    pub fn serialize<S: Serializer>(value: &Option<Witness>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(witness) => {
                let s = serde_json::to_string(witness).map_err(serde::ser::Error::custom)?;
                serializer.serialize_str(&s)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Witness>, D::Error> {
        let opt: Option<String> = Option::deserialize(deserializer)?;
        match opt {
            Some(s) if !s.is_empty() => {
                serde_json::from_str(&s).map(Some).map_err(serde::de::Error::custom)
            }
            _ => Ok(None),
        }
    }
}

impl Proof {
    /// Create a new unsigned proof record
    pub fn new(amount: Amount, keyset_id: Id, secret: Secret, c: PublicKey) -> Self {
        Self {
            amount,
            keyset_id,
            secret,
            c,
            witness: None,
            dleq: None,
        }
    }

    /// `Y = hash_to_curve(secret)`, the value used to key proof lookups and
    /// the mint's `/checkstate` endpoint.
    pub fn y(&self) -> Result<PublicKey, Error> {
        Ok(hash_to_curve(self.secret.as_bytes())?)
    }

    /// Attach a P2PK/HTLC preimage+signature witness
    pub fn with_witness(mut self, witness: Witness) -> Self {
        self.witness = Some(witness);
        self
    }
}

/// List of [`Proof`]
pub type Proofs = Vec<Proof>;

/// Utility methods on collections of [`Proof`]
pub trait ProofsMethods {
    /// Count proofs grouped by keyset
    fn count_by_keyset(&self) -> HashMap<Id, u64>;
    /// Sum amounts grouped by keyset
    fn sum_by_keyset(&self) -> HashMap<Id, Amount>;
    /// Sum of all amounts, failing on overflow
    fn total_amount(&self) -> Result<Amount, Error>;
    /// The `Y` value of every proof
    fn ys(&self) -> Result<Vec<PublicKey>, Error>;
    /// A copy with DLEQ proofs stripped, e.g. before sending to a mint that
    /// predates NUT-12
    fn without_dleqs(&self) -> Proofs;
}

impl ProofsMethods for Proofs {
    fn count_by_keyset(&self) -> HashMap<Id, u64> {
        let mut counts = HashMap::new();
        for proof in self {
            *counts.entry(proof.keyset_id).or_insert(0) += 1;
        }
        counts
    }

    fn sum_by_keyset(&self) -> HashMap<Id, Amount> {
        let mut sums = HashMap::new();
        for proof in self {
            *sums.entry(proof.keyset_id).or_insert(Amount::ZERO) += proof.amount;
        }
        sums
    }

    fn total_amount(&self) -> Result<Amount, Error> {
        Amount::try_sum(self.iter().map(|p| p.amount)).map_err(Into::into)
    }

    fn ys(&self) -> Result<Vec<PublicKey>, Error> {
        self.iter().map(Proof::y).collect()
    }

    fn without_dleqs(&self) -> Proofs {
        self.iter()
            .cloned()
            .map(|mut p| {
                p.dleq = None;
                p
            })
            .collect()
    }
}

#[cfg(feature = "wallet")]
/// A not-yet-blinded (secret, blinding factor, amount) triple awaiting the
/// BDHKE blind step.
#[derive(Debug, Clone)]
pub struct PreMint {
    /// Secret message
    pub secret: Secret,
    /// Blinding factor
    pub blinding_factor: SecretKey,
    /// Requested denomination
    pub amount: Amount,
    /// Derivation counter this pre-mint was derived at, if deterministic
    pub count: Option<u32>,
}

#[cfg(feature = "wallet")]
/// A batch of [`PreMint`]s together with the [`BlindedMessage`]s derived
/// from them, ready to submit to a mint.
#[derive(Debug, Clone, Default)]
pub struct PreMintSecrets {
    /// Keyset the outputs will belong to
    pub keyset_id: Option<Id>,
    /// The pre-blinding data, in output order
    pub secrets: Vec<PreMint>,
    /// Blinded messages, in the same order as `secrets`
    pub blinded_messages: Vec<BlindedMessage>,
}

#[cfg(feature = "wallet")]
impl PreMintSecrets {
    /// Build blinded outputs for `amounts` using freshly generated random
    /// secrets (non-deterministic path).
    pub fn random(keyset_id: Id, amounts: &[Amount]) -> Result<Self, Error> {
        let mut secrets = Vec::with_capacity(amounts.len());
        let mut blinded_messages = Vec::with_capacity(amounts.len());

        for &amount in amounts {
            let secret = Secret::generate();
            let (blinded, r) = crate::dhke::blind_message(secret.as_bytes(), None)?;

            blinded_messages.push(BlindedMessage {
                amount,
                keyset_id,
                blinded_secret: blinded,
                witness: None,
            });
            secrets.push(PreMint {
                secret,
                blinding_factor: r,
                amount,
                count: None,
            });
        }

        Ok(Self {
            keyset_id: Some(keyset_id),
            secrets,
            blinded_messages,
        })
    }

    /// Total requested amount across all outputs
    pub fn total_amount(&self) -> Result<Amount, Error> {
        Amount::try_sum(self.secrets.iter().map(|s| s.amount)).map_err(Into::into)
    }

    /// Secrets and blinding factors, in output order
    pub fn secrets(&self) -> Vec<Secret> {
        self.secrets.iter().map(|s| s.secret.clone()).collect()
    }

    /// Blinding factors, in output order
    pub fn rs(&self) -> Vec<SecretKey> {
        self.secrets.iter().map(|s| s.blinding_factor.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proof_y_matches_hash_to_curve() {
        let secret = Secret::new("test_message".to_string());
        let c = PublicKey::from_hex(
            "02194603ffa36356f4a56b7df9371fc3192472351453ec7398b8da8117e7c3e104",
        )
        .unwrap();
        let proof = Proof::new(Amount::from(1), test_id(), secret.clone(), c);

        assert_eq!(proof.y().unwrap(), hash_to_curve(secret.as_bytes()).unwrap());
    }

    #[test]
    fn test_proofs_total_and_count_by_keyset() {
        let id = test_id();
        let c = PublicKey::from_hex(
            "02194603ffa36356f4a56b7df9371fc3192472351453ec7398b8da8117e7c3e104",
        )
        .unwrap();
        let proofs: Proofs = vec![
            Proof::new(Amount::from(1), id, Secret::generate(), c),
            Proof::new(Amount::from(2), id, Secret::generate(), c),
        ];

        assert_eq!(proofs.total_amount().unwrap(), Amount::from(3));
        assert_eq!(*proofs.count_by_keyset().get(&id).unwrap(), 2);
    }

    fn test_id() -> Id {
        Id::from_str("009a1f293253e41e").unwrap()
    }
}
