//! Checkpoints for the mint (issuance) state machine.

use serde::{Deserialize, Serialize};

use crate::nuts::BlindedMessage;
use crate::Amount;

/// Resumable checkpoints of a mint operation:
/// `QuoteRequested → OutputsGenerated → MintSubmitted`, after which a
/// successful response unblinds and commits, ending the saga.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MintSagaState {
    /// A mint quote has been requested and is awaiting payment
    QuoteRequested,
    /// Blinded outputs were derived and counters reserved
    OutputsGenerated,
    /// The mint request was submitted; awaiting signatures
    MintSubmitted,
}

/// Data needed to resume or roll back an in-flight mint operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintOperationData {
    /// Mint quote id being redeemed
    pub quote_id: String,
    /// Total amount being minted
    pub amount: Amount,
    /// First reserved counter value for the active keyset
    pub counter_start: u32,
    /// One past the last reserved counter value
    pub counter_end: u32,
    /// Blinded messages submitted to the mint
    pub blinded_messages: Vec<BlindedMessage>,
}
