//! Checkpoints for the melt (redemption) state machine.

use serde::{Deserialize, Serialize};

use crate::nuts::BlindedMessage;
use crate::Amount;

/// Resumable checkpoints of a melt operation:
/// `InputsReserved → MeltSubmitted → PaymentPending`. A `PAID` response
/// commits spent inputs and any change; `UNPAID`/`FAILED` rolls the
/// reserved inputs back to `Available`.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeltSagaState {
    /// Input proofs covering the quote amount plus fee reserve were reserved
    InputsReserved,
    /// The melt request was submitted to the mint
    MeltSubmitted,
    /// The mint reported the outgoing payment as still in flight
    PaymentPending,
}

/// Data needed to resume or roll back an in-flight melt operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeltOperationData {
    /// Melt quote id being settled
    pub quote_id: String,
    /// Amount to be paid out, excluding the fee reserve
    pub amount: Amount,
    /// Fee reserve locked up alongside `amount`
    pub fee_reserve: Amount,
    /// First reserved counter value for blank change outputs
    pub counter_start: Option<u32>,
    /// One past the last reserved counter value
    pub counter_end: Option<u32>,
    /// Amount returned as change, once known
    pub change_amount: Option<Amount>,
    /// Blank blinded messages submitted for overpaid-fee change (NUT-08)
    pub change_blinded_messages: Vec<BlindedMessage>,
}
