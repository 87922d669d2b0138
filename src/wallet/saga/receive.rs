//! Checkpoints for the receive state machine.

use serde::{Deserialize, Serialize};

use crate::nuts::{BlindedMessage, Token};
use crate::Amount;

/// Resumable checkpoints of a receive operation:
/// `TokenDecoded → SwapRequested`, after which a successful swap response
/// commits the new proofs and ends the saga. Swapping defeats a sender who
/// kept a copy of the token and tries to double-spend it elsewhere.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiveSagaState {
    /// The token was decoded and its proofs validated locally
    TokenDecoded,
    /// A swap exchanging the token's proofs for fresh ones was requested
    SwapRequested,
}

/// Data needed to resume an in-flight receive operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveOperationData {
    /// The token being received
    pub token: Token,
    /// First reserved counter value for the swap's outputs
    pub counter_start: u32,
    /// One past the last reserved counter value
    pub counter_end: u32,
    /// Net amount after the mint's input fee
    pub amount: Amount,
    /// Blinded messages submitted to the mint
    pub blinded_messages: Vec<BlindedMessage>,
}
