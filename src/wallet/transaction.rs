//! Derived, read-only ledger entries.
//!
//! A [`Transaction`] is never the source of truth for balance or spend
//! state; it's a record the wallet appends for history/export purposes
//! whenever a saga reaches `CommitProofs`. Its id is a hash of the `Y`
//! values it moved, so importing the same operation twice is detectable.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use bitcoin::hashes::{sha256, Hash, HashEngine};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::mint_url::MintUrl;
use crate::nuts::{CurrencyUnit, PaymentMethod, Proofs, PublicKey};
use crate::Amount;

/// Direction of value flow for a [`Transaction`], from the wallet's
/// perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionDirection {
    /// Value entered the wallet (mint, receive)
    Incoming,
    /// Value left the wallet (melt, send)
    Outgoing,
}

impl std::fmt::Display for TransactionDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incoming => write!(f, "incoming"),
            Self::Outgoing => write!(f, "outgoing"),
        }
    }
}

impl FromStr for TransactionDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incoming" => Ok(Self::Incoming),
            "outgoing" => Ok(Self::Outgoing),
            _ => Err(Error::InvalidDirection),
        }
    }
}

/// Errors specific to transaction parsing.
#[derive(Debug, ThisError)]
pub enum Error {
    /// An unrecognized [`TransactionDirection`] string
    #[error("invalid transaction direction")]
    InvalidDirection,
    /// A hex string of the wrong length or invalid characters
    #[error("invalid transaction id")]
    InvalidId,
}

/// A SHA256 hash over the sorted `Y` values a transaction moved, used to
/// detect re-importing the same operation twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId([u8; 32]);

impl TransactionId {
    /// Derive an id from the `Y` values involved, order-independent.
    pub fn new(mut ys: Vec<PublicKey>) -> Self {
        ys.sort();
        let mut engine = sha256::Hash::engine();
        for y in &ys {
            engine.input(&y.to_bytes());
        }
        Self(sha256::Hash::from_engine(engine).to_byte_array())
    }

    /// Derive an id directly from a proof set, via their `Y` values.
    pub fn from_proofs(proofs: &Proofs) -> Result<Self, crate::nuts::nut00::Error> {
        let ys = proofs.iter().map(|p| p.y()).collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(ys))
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use bitcoin::hex::DisplayHex;
        write!(f, "{}", self.0.to_lower_hex_string())
    }
}

impl FromStr for TransactionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use bitcoin::hex::FromHex;
        let bytes = Vec::<u8>::from_hex(s).map_err(|_| Error::InvalidId)?;
        let array: [u8; 32] = bytes.try_into().map_err(|_| Error::InvalidId)?;
        Ok(Self(array))
    }
}

/// A single ledger entry: a completed mint/send/receive/melt/swap leaves
/// one of these behind once its saga commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Mint this transaction was conducted against
    pub mint_url: MintUrl,
    /// Incoming or outgoing
    pub direction: TransactionDirection,
    /// Net amount moved, excluding fees
    pub amount: Amount,
    /// Fee paid, if any
    pub fee: Amount,
    /// Currency unit
    pub unit: CurrencyUnit,
    /// `Y` values of the proofs this transaction moved
    pub ys: Vec<PublicKey>,
    /// Unix timestamp the transaction was recorded at
    pub timestamp: u64,
    /// Optional memo, e.g. a token's embedded message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// Free-form metadata, e.g. the payment method used
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Quote id, for mint/melt transactions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_id: Option<String>,
    /// Payment method, for mint/melt transactions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    /// Id of the saga that produced this transaction
    pub saga_id: uuid::Uuid,
}

impl Transaction {
    /// This transaction's id, derived from its `ys`
    pub fn id(&self) -> TransactionId {
        TransactionId::new(self.ys.clone())
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Transaction {}

impl PartialOrd for Transaction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Transaction {
    fn cmp(&self, other: &Self) -> Ordering {
        // Most recent first; ties broken by id for a total order.
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| self.id().cmp(&other.id()))
    }
}

impl PartialOrd for TransactionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TransactionId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn test_id_is_order_independent() {
        let a = PublicKey::from_hex("02194603ffa36356f4a56b7df9371fc3192472351453ec7398b8da8117e7c3e104")
            .unwrap();
        let b = PublicKey::from_hex("03d56ce4e446a85bbdaa547b4ec2b073d40ff802831352b8272b7dd7a4de5a7cc")
            .unwrap();

        let id1 = TransactionId::new(vec![a, b]);
        let id2 = TransactionId::new(vec![b, a]);
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_id_round_trips_through_display() {
        let a = PublicKey::from_hex("02194603ffa36356f4a56b7df9371fc3192472351453ec7398b8da8117e7c3e104")
            .unwrap();
        let id = TransactionId::new(vec![a]);
        let parsed = TransactionId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_direction_display_and_parse_round_trip() {
        assert_eq!(
            TransactionDirection::from_str("incoming").unwrap(),
            TransactionDirection::Incoming
        );
        assert_eq!(TransactionDirection::Outgoing.to_string(), "outgoing");
    }
}
