//! Checkpoints for the standalone swap state machine.

use serde::{Deserialize, Serialize};

use crate::nuts::BlindedMessage;
use crate::Amount;

/// Resumable checkpoints of a swap operation:
/// `InputsReserved → OutputsGenerated → SwapSubmitted`, after which a
/// successful response unblinds, marks the inputs spent and commits the
/// new proofs, ending the saga.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapSagaState {
    /// Input proofs were selected and reserved
    InputsReserved,
    /// Blinded outputs were derived and counters reserved
    OutputsGenerated,
    /// The swap request was submitted; awaiting signatures
    SwapSubmitted,
}

/// Data needed to resume or roll back an in-flight swap operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOperationData {
    /// Sum of the input proofs being swapped
    pub input_amount: Amount,
    /// Sum of the requested output amounts
    pub output_amount: Amount,
    /// First reserved counter value for the active keyset
    pub counter_start: u32,
    /// One past the last reserved counter value
    pub counter_end: u32,
    /// Blinded messages submitted to the mint
    pub blinded_messages: Vec<BlindedMessage>,
}
