//! NUT-11: Pay to Public Key (P2PK)
//!
//! <https://github.com/cashubtc/nuts/blob/main/11.md>

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use bitcoin::hashes::sha256::Hash as Sha256Hash;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::schnorr::Signature;
use serde::de::Error as DeserializerError;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::nut00::{BlindedMessage, Proof, Proofs, Witness};
use super::nut01::{PublicKey, SecretKey};
use super::nut10::{Kind, Secret as Nut10Secret};
use crate::secret::Secret;
use crate::util::{hex, unix_time};
use crate::ensure_wallet;

pub mod serde_p2pk_witness;

/// NUT-11 errors
#[derive(Debug, Error)]
pub enum Error {
    /// Secret is not a P2PK secret
    #[error("secret is not a p2pk secret")]
    IncorrectSecretKind,
    /// Witness is not a P2PK witness
    #[error("witness is not a p2pk witness")]
    IncorrectWitnessKind,
    /// P2PK locktime has already passed
    #[error("locktime in past")]
    LocktimeInPast,
    /// Witness signature is not valid
    #[error("invalid signature")]
    InvalidSignature,
    /// Unknown tag in P2PK secret
    #[error("unknown tag in p2pk secret")]
    UnknownTag,
    /// Unknown sigflag
    #[error("unknown sigflag")]
    UnknownSigFlag,
    /// P2PK spend conditions not met
    #[error("p2pk spend conditions are not met")]
    SpendConditionsNotMet,
    /// Pubkey must be present in the secret's data field
    #[error("p2pk pubkey required in secret data")]
    P2PKPubkeyRequired,
    /// Unknown tag kind
    #[error("tag kind not found")]
    KindNotFound,
    /// HTLC hash invalid
    #[error("invalid hash")]
    InvalidHash,
    /// HTLC preimage too large
    #[error("preimage exceeds maximum size of 32 bytes (64 hex characters)")]
    PreimageTooLarge,
    /// Witness signatures not provided
    #[error("witness signatures not provided")]
    SignaturesNotProvided,
    /// Duplicate signature from same pubkey
    #[error("duplicate signature from the same pubkey detected")]
    DuplicateSignature,
    /// Parse int error
    #[error(transparent)]
    ParseInt(#[from] std::num::ParseIntError),
    /// Hex decode error
    #[error(transparent)]
    HexError(#[from] hex::Error),
    /// Serde Json error
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
    /// secp256k1 error
    #[error(transparent)]
    Secp256k1(#[from] bitcoin::secp256k1::Error),
    /// NUT-01 error
    #[error(transparent)]
    Nut01(#[from] crate::nuts::nut01::Error),
    /// Secret error
    #[error(transparent)]
    Secret(#[from] crate::secret::Error),
    /// NUT-10 error
    #[error(transparent)]
    Nut10(#[from] crate::nuts::nut10::Error),
}

/// P2PK witness: a list of Schnorr signatures over the locked secret.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct P2PKWitness {
    /// Signatures, hex-encoded
    pub signatures: Vec<String>,
}

impl P2PKWitness {
    /// Whether no signatures have been attached yet
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

impl Proof {
    /// Sign this proof's secret and attach (or extend) its P2PK witness.
    pub fn sign_p2pk(&mut self, secret_key: SecretKey) -> Result<(), Error> {
        let msg: Vec<u8> = self.secret.to_bytes();
        let signature: Signature = secret_key.sign(&msg)?;
        let signatures = vec![signature.to_string()];

        match self.witness.as_mut() {
            Some(witness) => witness.add_signatures(signatures),
            None => {
                let mut witness = Witness::P2PKWitness(P2PKWitness::default());
                witness.add_signatures(signatures);
                self.witness = Some(witness);
            }
        }

        Ok(())
    }

    /// Verify the P2PK spending condition on this proof's secret.
    pub fn verify_p2pk(&self) -> Result<(), Error> {
        let secret: Nut10Secret = self.secret.clone().try_into()?;
        let conditions: Conditions = secret
            .secret_data()
            .tags()
            .cloned()
            .unwrap_or_default()
            .try_into()?;
        let msg: &[u8] = self.secret.as_bytes();

        let witness_signatures = self
            .witness
            .as_ref()
            .and_then(Witness::signatures)
            .ok_or(Error::SignaturesNotProvided)?;

        // NUT-11: once locktime has passed, refund keys (if present) take
        // over authorization; with no refund keys, the proof becomes
        // anyone-can-spend.
        if let Some(locktime) = conditions.locktime {
            if unix_time() >= locktime {
                return match conditions.refund_keys {
                    Some(refund_keys) => {
                        let needed = conditions.num_sigs_refund.unwrap_or(1);
                        let sigs = parse_signatures(&witness_signatures)?;
                        if valid_signatures(msg, &refund_keys, &sigs)? >= needed {
                            Ok(())
                        } else {
                            Err(Error::SpendConditionsNotMet)
                        }
                    }
                    None => Ok(()),
                };
            }
        }

        let mut pubkeys = conditions.pubkeys.clone().unwrap_or_default();
        if secret.kind() == Kind::P2PK {
            pubkeys.push(PublicKey::from_str(secret.secret_data().data())?);
        }

        let sigs = parse_signatures(&witness_signatures)?;
        let valid_sigs = valid_signatures(msg, &pubkeys, &sigs)?;

        if valid_sigs >= conditions.num_sigs.unwrap_or(1) {
            Ok(())
        } else {
            Err(Error::SpendConditionsNotMet)
        }
    }
}

fn parse_signatures(signatures: &[String]) -> Result<Vec<Signature>, Error> {
    signatures
        .iter()
        .map(|s| Signature::from_str(s).map_err(Error::from))
        .collect()
}

/// Count valid signatures against a pubkey set, each pubkey counted once.
/// Errors if the same pubkey produces more than one valid signature, since
/// that is never legitimately required and usually indicates a malformed
/// witness.
pub fn valid_signatures(
    msg: &[u8],
    pubkeys: &[PublicKey],
    signatures: &[Signature],
) -> Result<u64, Error> {
    let mut verified = HashSet::new();

    for pubkey in pubkeys {
        for signature in signatures {
            if pubkey.verify(msg, signature).is_ok() && !verified.insert(*pubkey) {
                return Err(Error::DuplicateSignature);
            }
        }
    }

    Ok(verified.len() as u64)
}

impl BlindedMessage {
    /// Sign this output's blinded secret (NUT-20 quote-locking / NUT-11
    /// SIG_ALL outputs).
    pub fn sign_p2pk(&mut self, secret_key: SecretKey) -> Result<(), Error> {
        let msg: [u8; 33] = self.blinded_secret.to_bytes();
        let signature: Signature = secret_key.sign(&msg)?;
        self.witness = Some(signature.to_string());
        Ok(())
    }
}

/// Spending conditions recognised by this crate: [NUT-11] P2PK and
/// [NUT-14] HTLC.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpendingConditions {
    /// Pay-to-pubkey
    P2PKConditions {
        /// Recipient pubkey
        data: PublicKey,
        /// Additional conditions
        conditions: Option<Conditions>,
    },
    /// Hashed timelock
    HTLCConditions {
        /// Payment hash
        data: Sha256Hash,
        /// Additional conditions
        conditions: Option<Conditions>,
    },
}

impl SpendingConditions {
    /// Build an HTLC condition from a 32-byte preimage.
    pub fn new_htlc(preimage: String, conditions: Option<Conditions>) -> Result<Self, Error> {
        const PREIMAGE_BYTES: usize = 32;
        let preimage_bytes = hex::decode(preimage)?;
        if preimage_bytes.len() != PREIMAGE_BYTES {
            return Err(Error::PreimageTooLarge);
        }
        Ok(Self::HTLCConditions {
            data: Sha256Hash::hash(&preimage_bytes),
            conditions,
        })
    }

    /// Build an HTLC condition directly from a payment hash.
    pub fn new_htlc_hash(hash: &str, conditions: Option<Conditions>) -> Result<Self, Error> {
        let hash = Sha256Hash::from_str(hash).map_err(|_| Error::InvalidHash)?;
        Ok(Self::HTLCConditions { data: hash, conditions })
    }

    /// Build a P2PK condition locked to `pubkey`.
    pub fn new_p2pk(pubkey: PublicKey, conditions: Option<Conditions>) -> Self {
        Self::P2PKConditions { data: pubkey, conditions }
    }

    /// NUT-10 kind of this condition.
    pub fn kind(&self) -> Kind {
        match self {
            Self::P2PKConditions { .. } => Kind::P2PK,
            Self::HTLCConditions { .. } => Kind::HTLC,
        }
    }

    /// Pubkeys authorized to spend before locktime.
    pub fn pubkeys(&self) -> Option<Vec<PublicKey>> {
        match self {
            Self::P2PKConditions { data, conditions } => {
                let mut pubkeys = vec![*data];
                if let Some(conditions) = conditions {
                    pubkeys.extend(conditions.pubkeys.clone().unwrap_or_default());
                }
                let unique: HashSet<_> = pubkeys.into_iter().collect();
                Some(unique.into_iter().collect())
            }
            Self::HTLCConditions { conditions, .. } => conditions.clone().and_then(|c| c.pubkeys),
        }
    }

    /// Locktime after which refund keys (or anyone, if none) may spend.
    pub fn locktime(&self) -> Option<u64> {
        match self {
            Self::P2PKConditions { conditions, .. } | Self::HTLCConditions { conditions, .. } => {
                conditions.as_ref().and_then(|c| c.locktime)
            }
        }
    }

    /// Whether the locktime has passed.
    pub fn expired(&self) -> bool {
        self.locktime().is_some_and(|t| unix_time() > t)
    }

    /// Pubkeys that may currently authorize a spend, accounting for
    /// locktime expiry.
    pub fn authorized_keys(&self) -> Option<Vec<PublicKey>> {
        if self.expired() {
            self.refund_keys()
        } else {
            self.pubkeys()
        }
    }

    /// Refund pubkeys, valid after locktime.
    pub fn refund_keys(&self) -> Option<Vec<PublicKey>> {
        match self {
            Self::P2PKConditions { conditions, .. } | Self::HTLCConditions { conditions, .. } => {
                conditions.clone().and_then(|c| c.refund_keys)
            }
        }
    }
}

impl TryFrom<&Secret> for SpendingConditions {
    type Error = Error;
    fn try_from(secret: &Secret) -> Result<Self, Error> {
        let nut10: Nut10Secret = secret.try_into()?;
        nut10.try_into()
    }
}

impl TryFrom<Nut10Secret> for SpendingConditions {
    type Error = Error;
    fn try_from(secret: Nut10Secret) -> Result<Self, Error> {
        match secret.kind() {
            Kind::P2PK => Ok(Self::P2PKConditions {
                data: PublicKey::from_str(secret.secret_data().data())?,
                conditions: secret.secret_data().tags().and_then(|t| t.clone().try_into().ok()),
            }),
            Kind::HTLC => Ok(Self::HTLCConditions {
                data: Sha256Hash::from_str(secret.secret_data().data()).map_err(|_| Error::InvalidHash)?,
                conditions: secret.secret_data().tags().and_then(|t| t.clone().try_into().ok()),
            }),
        }
    }
}

impl From<SpendingConditions> for Nut10Secret {
    fn from(conditions: SpendingConditions) -> Self {
        match conditions {
            SpendingConditions::P2PKConditions { data, conditions } => {
                Nut10Secret::new(Kind::P2PK, data.to_hex(), conditions)
            }
            SpendingConditions::HTLCConditions { data, conditions } => {
                Nut10Secret::new(Kind::HTLC, data.to_string(), conditions)
            }
        }
    }
}

/// Additional P2PK/HTLC conditions carried in a NUT-10 secret's `tags`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Conditions {
    /// Unix time after which refund keys can spend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locktime: Option<u64>,
    /// Additional authorized pubkeys
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubkeys: Option<Vec<PublicKey>>,
    /// Refund pubkeys, authorized after locktime
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_keys: Option<Vec<PublicKey>>,
    /// Signatures required, default 1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_sigs: Option<u64>,
    /// Signature scope, default [`SigFlag::SigInputs`]
    pub sig_flag: SigFlag,
    /// Refund signatures required, default 1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_sigs_refund: Option<u64>,
}

impl Conditions {
    /// Build a new set of conditions, rejecting a locktime already in the
    /// past.
    pub fn new(
        locktime: Option<u64>,
        pubkeys: Option<Vec<PublicKey>>,
        refund_keys: Option<Vec<PublicKey>>,
        num_sigs: Option<u64>,
        sig_flag: Option<SigFlag>,
        num_sigs_refund: Option<u64>,
    ) -> Result<Self, Error> {
        if let Some(locktime) = locktime {
            ensure_wallet!(locktime >= unix_time(), Error::LocktimeInPast);
        }

        Ok(Self {
            locktime,
            pubkeys,
            refund_keys,
            num_sigs,
            sig_flag: sig_flag.unwrap_or_default(),
            num_sigs_refund,
        })
    }
}

impl From<Conditions> for Vec<Vec<String>> {
    fn from(conditions: Conditions) -> Self {
        let Conditions { locktime, pubkeys, refund_keys, num_sigs, sig_flag, num_sigs_refund } = conditions;

        let mut tags = Vec::new();
        if let Some(pubkeys) = pubkeys {
            tags.push(Tag::PubKeys(pubkeys).as_vec());
        }
        if let Some(locktime) = locktime {
            tags.push(Tag::LockTime(locktime).as_vec());
        }
        if let Some(num_sigs) = num_sigs {
            tags.push(Tag::NSigs(num_sigs).as_vec());
        }
        if let Some(refund_keys) = refund_keys {
            tags.push(Tag::Refund(refund_keys).as_vec());
        }
        if let Some(num_sigs_refund) = num_sigs_refund {
            tags.push(Tag::NSigsRefund(num_sigs_refund).as_vec());
        }
        tags.push(Tag::SigFlag(sig_flag).as_vec());
        tags
    }
}

impl TryFrom<Vec<Vec<String>>> for Conditions {
    type Error = Error;

    fn try_from(tags: Vec<Vec<String>>) -> Result<Self, Error> {
        let tags: HashMap<TagKind, Tag> = tags
            .into_iter()
            .map(Tag::try_from)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|t| (t.kind(), t))
            .collect();

        let pubkeys = match tags.get(&TagKind::Pubkeys) {
            Some(Tag::PubKeys(k)) => Some(k.clone()),
            _ => None,
        };
        let locktime = match tags.get(&TagKind::Locktime) {
            Some(Tag::LockTime(t)) => Some(*t),
            _ => None,
        };
        let refund_keys = match tags.get(&TagKind::Refund) {
            Some(Tag::Refund(k)) => Some(k.clone()),
            _ => None,
        };
        let sig_flag = match tags.get(&TagKind::SigFlag) {
            Some(Tag::SigFlag(f)) => *f,
            _ => SigFlag::SigInputs,
        };
        let num_sigs = match tags.get(&TagKind::NSigs) {
            Some(Tag::NSigs(n)) => Some(*n),
            _ => None,
        };
        let num_sigs_refund = match tags.get(&TagKind::NSigsRefund) {
            Some(Tag::NSigsRefund(n)) => Some(*n),
            _ => None,
        };

        Ok(Self { locktime, pubkeys, refund_keys, num_sigs, sig_flag, num_sigs_refund })
    }
}

/// Tag name used inside a NUT-10 secret's `tags` array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    /// `sigflag`
    SigFlag,
    /// `n_sigs`
    #[serde(rename = "n_sigs")]
    NSigs,
    /// `locktime`
    Locktime,
    /// `refund`
    Refund,
    /// `pubkeys`
    Pubkeys,
    /// `n_sigs_refund`
    #[serde(rename = "n_sigs_refund")]
    NSigsRefund,
    /// Forward-compatible unknown tag
    Custom(String),
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SigFlag => write!(f, "sigflag"),
            Self::NSigs => write!(f, "n_sigs"),
            Self::Locktime => write!(f, "locktime"),
            Self::Refund => write!(f, "refund"),
            Self::Pubkeys => write!(f, "pubkeys"),
            Self::NSigsRefund => write!(f, "n_sigs_refund"),
            Self::Custom(c) => write!(f, "{c}"),
        }
    }
}

impl<S: AsRef<str>> From<S> for TagKind {
    fn from(tag: S) -> Self {
        match tag.as_ref() {
            "sigflag" => Self::SigFlag,
            "n_sigs" => Self::NSigs,
            "locktime" => Self::Locktime,
            "refund" => Self::Refund,
            "pubkeys" => Self::Pubkeys,
            "n_sigs_refund" => Self::NSigsRefund,
            t => Self::Custom(t.to_owned()),
        }
    }
}

/// Who must sign: just the inputs, or inputs and outputs together.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, PartialOrd, Ord, Hash)]
pub enum SigFlag {
    /// Only the spent proofs need signing (the default).
    #[default]
    SigInputs,
    /// Every input and every output must be signed, binding the whole
    /// operation (NUT-11's `SIG_ALL` flag).
    SigAll,
}

impl fmt::Display for SigFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SigAll => write!(f, "SIG_ALL"),
            Self::SigInputs => write!(f, "SIG_INPUTS"),
        }
    }
}

impl FromStr for SigFlag {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SIG_ALL" => Ok(Self::SigAll),
            "SIG_INPUTS" => Ok(Self::SigInputs),
            _ => Err(Error::UnknownSigFlag),
        }
    }
}

/// The strictest sigflag/pubkey-set/threshold implied by a set of proofs
/// about to be spent together.
pub fn enforce_sig_flag(proofs: Proofs) -> EnforceSigFlag {
    let mut sig_flag = SigFlag::SigInputs;
    let mut pubkeys = HashSet::new();
    let mut sigs_required = 1;

    for proof in proofs {
        let Ok(secret) = Nut10Secret::try_from(proof.secret) else { continue };

        if secret.kind() == Kind::P2PK {
            if let Ok(key) = PublicKey::from_str(secret.secret_data().data()) {
                pubkeys.insert(key);
            }
        }

        if let Some(tags) = secret.secret_data().tags() {
            if let Ok(conditions) = Conditions::try_from(tags.clone()) {
                if conditions.sig_flag == SigFlag::SigAll {
                    sig_flag = SigFlag::SigAll;
                }
                if let Some(sigs) = conditions.num_sigs {
                    sigs_required = sigs_required.max(sigs);
                }
                if let Some(pubs) = conditions.pubkeys {
                    pubkeys.extend(pubs);
                }
            }
        }
    }

    EnforceSigFlag { sig_flag, pubkeys, sigs_required }
}

/// Aggregate signing requirement for a batch of proofs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnforceSigFlag {
    /// Strictest sigflag across the batch
    pub sig_flag: SigFlag,
    /// Union of pubkeys any proof in the batch authorizes
    pub pubkeys: HashSet<PublicKey>,
    /// Highest signature threshold across the batch
    pub sigs_required: u64,
}

/// The message a SIG_ALL signature commits to: every input secret and
/// unblinded signature, followed by every output's amount, keyset id and
/// blinded secret, concatenated in order.
pub fn sig_all_message(inputs: &Proofs, outputs: &[BlindedMessage]) -> String {
    let mut msg = String::new();
    for proof in inputs {
        msg.push_str(&proof.secret.to_string());
        msg.push_str(&proof.c.to_hex());
    }
    for output in outputs {
        msg.push_str(&output.amount.to_string());
        msg.push_str(&output.keyset_id.to_string());
        msg.push_str(&output.blinded_secret.to_hex());
    }
    msg
}

/// A single tag entry inside a NUT-10 secret's `tags` array.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Tag {
    /// `["sigflag", "SIG_ALL" | "SIG_INPUTS"]`
    SigFlag(SigFlag),
    /// `["n_sigs", "<n>"]`
    NSigs(u64),
    /// `["locktime", "<unix_time>"]`
    LockTime(u64),
    /// `["refund", <pubkey>, ...]`
    Refund(Vec<PublicKey>),
    /// `["pubkeys", <pubkey>, ...]`
    PubKeys(Vec<PublicKey>),
    /// `["n_sigs_refund", "<n>"]`
    NSigsRefund(u64),
    /// Unrecognised tag, preserved verbatim
    Custom(String, Vec<String>),
}

impl Tag {
    /// This tag's [`TagKind`].
    pub fn kind(&self) -> TagKind {
        match self {
            Self::SigFlag(_) => TagKind::SigFlag,
            Self::NSigs(_) => TagKind::NSigs,
            Self::LockTime(_) => TagKind::Locktime,
            Self::Refund(_) => TagKind::Refund,
            Self::PubKeys(_) => TagKind::Pubkeys,
            Self::NSigsRefund(_) => TagKind::NSigsRefund,
            Self::Custom(name, _) => TagKind::Custom(name.clone()),
        }
    }

    /// Render as the `Vec<String>` wire form.
    pub fn as_vec(&self) -> Vec<String> {
        self.clone().into()
    }
}

impl<S: AsRef<str>> TryFrom<Vec<S>> for Tag {
    type Error = Error;

    fn try_from(tag: Vec<S>) -> Result<Self, Error> {
        let kind = tag.first().map(TagKind::from).ok_or(Error::KindNotFound)?;

        match kind {
            TagKind::SigFlag => Ok(Self::SigFlag(SigFlag::from_str(tag[1].as_ref())?)),
            TagKind::NSigs => Ok(Self::NSigs(tag[1].as_ref().parse()?)),
            TagKind::Locktime => Ok(Self::LockTime(tag[1].as_ref().parse()?)),
            TagKind::Refund => Ok(Self::Refund(
                tag.iter().skip(1).map(|p| PublicKey::from_str(p.as_ref())).collect::<Result<_, _>>()?,
            )),
            TagKind::Pubkeys => Ok(Self::PubKeys(
                tag.iter().skip(1).map(|p| PublicKey::from_str(p.as_ref())).collect::<Result<_, _>>()?,
            )),
            TagKind::NSigsRefund => Ok(Self::NSigsRefund(tag[1].as_ref().parse()?)),
            TagKind::Custom(name) => Ok(Self::Custom(
                name,
                tag.iter().skip(1).map(|p| p.as_ref().to_string()).collect(),
            )),
        }
    }
}

impl From<Tag> for Vec<String> {
    fn from(tag: Tag) -> Self {
        match tag {
            Tag::SigFlag(f) => vec![TagKind::SigFlag.to_string(), f.to_string()],
            Tag::NSigs(n) => vec![TagKind::NSigs.to_string(), n.to_string()],
            Tag::LockTime(t) => vec![TagKind::Locktime.to_string(), t.to_string()],
            Tag::PubKeys(keys) => {
                let mut v = vec![TagKind::Pubkeys.to_string()];
                v.extend(keys.into_iter().map(|k| k.to_string()));
                v
            }
            Tag::Refund(keys) => {
                let mut v = vec![TagKind::Refund.to_string()];
                v.extend(keys.into_iter().map(|k| k.to_string()));
                v
            }
            Tag::NSigsRefund(n) => vec![TagKind::NSigsRefund.to_string(), n.to_string()],
            Tag::Custom(name, rest) => {
                let mut v = vec![name];
                v.extend(rest);
                v
            }
        }
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let data = self.as_vec();
        let mut seq = serializer.serialize_seq(Some(data.len()))?;
        for element in data {
            seq.serialize_element(&element)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let vec = Vec::<String>::deserialize(deserializer)?;
        Self::try_from(vec).map_err(DeserializerError::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::nuts::nut02::Id;
    use crate::Amount;

    #[test]
    fn test_sign_and_verify_p2pk() {
        let secret_key = SecretKey::generate();
        let pubkey = secret_key.public_key();

        let conditions = Conditions::new(None, None, None, Some(1), None, None).unwrap();
        let nut10 = Nut10Secret::new(Kind::P2PK, pubkey.to_hex(), Some(conditions));
        let secret: Secret = nut10.try_into().unwrap();

        let mut proof = Proof::new(
            Amount::from(1),
            Id::from_str("009a1f293253e41e").unwrap(),
            secret,
            pubkey,
        );

        assert!(proof.verify_p2pk().is_err());
        proof.sign_p2pk(secret_key).unwrap();
        assert!(proof.verify_p2pk().is_ok());
    }

    #[test]
    fn test_verify_p2pk_wrong_key_fails() {
        let owner_key = SecretKey::generate();
        let attacker_key = SecretKey::generate();

        let nut10 = Nut10Secret::new(Kind::P2PK, owner_key.public_key().to_hex(), None::<Vec<Vec<String>>>);
        let secret: Secret = nut10.try_into().unwrap();
        let mut proof = Proof::new(
            Amount::from(1),
            Id::from_str("009a1f293253e41e").unwrap(),
            secret,
            owner_key.public_key(),
        );

        proof.sign_p2pk(attacker_key).unwrap();
        assert!(proof.verify_p2pk().is_err());
    }

    #[test]
    fn test_conditions_tag_round_trip() {
        let conditions = Conditions::new(
            Some(99_999_999_999),
            Some(vec![SecretKey::generate().public_key()]),
            Some(vec![SecretKey::generate().public_key()]),
            Some(2),
            Some(SigFlag::SigAll),
            Some(1),
        )
        .unwrap();

        let tags: Vec<Vec<String>> = conditions.clone().into();
        let parsed = Conditions::try_from(tags).unwrap();
        assert_eq!(conditions, parsed);
    }

    #[test]
    fn test_enforce_sig_flag_picks_strictest() {
        let key = SecretKey::generate();
        let conditions = Conditions::new(None, None, None, Some(3), Some(SigFlag::SigAll), None).unwrap();
        let nut10 = Nut10Secret::new(Kind::P2PK, key.public_key().to_hex(), Some(conditions));
        let secret: Secret = nut10.try_into().unwrap();
        let proof = Proof::new(Amount::from(1), Id::from_str("009a1f293253e41e").unwrap(), secret, key.public_key());

        let enforced = enforce_sig_flag(vec![proof]);
        assert_eq!(enforced.sig_flag, SigFlag::SigAll);
        assert_eq!(enforced.sigs_required, 3);
    }
}
