//! Checkpoints for the send state machine.

use serde::{Deserialize, Serialize};

use crate::nuts::{Proofs, Token};
use crate::Amount;

/// Resumable checkpoints of a send operation:
/// `InputsReserved → SwapRequested → TokenEncoded`, or `RollingBack` if the
/// operation was cancelled or timed out before committing.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendSagaState {
    /// Proofs covering the requested amount were reserved
    InputsReserved,
    /// A swap to fresh, unlinkable proofs has been requested
    SwapRequested,
    /// The outgoing token has been encoded and is ready to hand to the payee
    TokenEncoded,
    /// Releasing reserved proofs back to `Available` after cancellation
    RollingBack,
}

/// Data needed to resume or roll back an in-flight send operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOperationData {
    /// Amount being sent, excluding any change kept by the wallet
    pub amount: Amount,
    /// Optional memo embedded in the resulting token
    pub memo: Option<String>,
    /// First reserved counter value, if the send involves a swap
    pub counter_start: Option<u32>,
    /// One past the last reserved counter value
    pub counter_end: Option<u32>,
    /// The encoded token, once produced
    pub token: Option<Token>,
    /// Proofs reserved for this send
    pub proofs: Proofs,
}
