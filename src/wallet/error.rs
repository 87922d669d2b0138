//! Top-level wallet error, composing the per-NUT error types.

use thiserror::Error;

/// Errors surfaced by the wallet orchestrator and its supporting
/// subsystems (proof store, selection engine, keyset manager).
#[derive(Debug, Error)]
pub enum Error {
    /// No combination of available proofs can cover the requested amount
    /// plus fees.
    #[error("insufficient balance")]
    InsufficientBalance,
    /// The available proof set for the requested mint/unit is empty.
    #[error("no spendable proofs")]
    NoSpendableProofs,
    /// A proof the caller tried to add was already present in the store.
    #[error("duplicate proof for keyset {keyset_id}")]
    DuplicateProof {
        /// Keyset id of the duplicate
        keyset_id: String,
    },
    /// Declared input/output amounts don't balance against the fee.
    #[error("transaction does not balance: inputs {inputs}, outputs {outputs}, fee {fee}")]
    BalanceMismatch {
        /// Sum of input amounts
        inputs: u64,
        /// Sum of output amounts
        outputs: u64,
        /// Fee charged
        fee: u64,
    },
    /// Attempted to mutate a proof that isn't tracked by the store.
    #[error("unknown proof")]
    UnknownProof,
    /// No active keyset is known for the requested unit.
    #[error("no active keyset for unit")]
    NoActiveKeyset,
    /// The mint's quote for this operation has expired.
    #[error("quote expired")]
    QuoteExpired,
    /// The requested quote id is not known to the wallet.
    #[error("unknown quote")]
    QuoteUnknown,
    /// A saga record was found in a state its operation kind can't produce.
    #[error("invalid operation state")]
    InvalidOperationState,
    /// A saga's optimistic-lock version didn't match on update, meaning
    /// another wallet instance already advanced it.
    #[error("saga version conflict")]
    SagaVersionConflict,
    /// The mint reported these inputs as already spent.
    #[error("already spent")]
    AlreadySpent,
    /// A P2PK/HTLC spending condition on an input or output was not met.
    #[error("spending condition not met: {0}")]
    SpendConditionsNotMet(String),
    /// amount.rs error
    #[error(transparent)]
    Amount(#[from] crate::amount::Error),
    /// nut00 error
    #[error(transparent)]
    Nut00(#[from] crate::nuts::nut00::Error),
    /// nut01 error
    #[error(transparent)]
    Nut01(#[from] crate::nuts::nut01::Error),
    /// nut02 error
    #[error(transparent)]
    Nut02(#[from] crate::nuts::nut02::Error),
    /// nut11 error
    #[error(transparent)]
    Nut11(#[from] crate::nuts::nut11::Error),
    /// nut12 error
    #[error(transparent)]
    Nut12(#[from] crate::nuts::nut12::Error),
    /// nut13 error
    #[error(transparent)]
    Nut13(#[from] crate::nuts::nut13::Error),
    /// nut14 error
    #[error(transparent)]
    Nut14(#[from] crate::nuts::nut14::Error),
    /// dhke error
    #[error(transparent)]
    Dhke(#[from] crate::dhke::Error),
    /// mint_url error
    #[error(transparent)]
    MintUrl(#[from] crate::mint_url::Error),
    /// secret error
    #[error(transparent)]
    Secret(#[from] crate::secret::Error),
    /// transaction id parsing error
    #[error(transparent)]
    Transaction(#[from] crate::wallet::transaction::Error),
}
