//! Transport-agnostic mint RPC surface.
//!
//! The wallet core never speaks HTTP directly; it calls through
//! [`MintConnector`], leaving the actual request/response plumbing (and its
//! retry/timeout policy) to a host application. The request/response shapes
//! here mirror the mint's public HTTP API but only carry the fields the
//! wallet orchestrator actually consumes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::nuts::{BlindSignature, BlindedMessage, CurrencyUnit, Id, KeysResponse, KeysetResponse, PaymentMethod, Proofs, PublicKey};
use crate::wallet::mint_info::MintInfo;
use crate::wallet::Error;
use crate::Amount;

/// Lifecycle of a mint (issuance) quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MintQuoteState {
    /// Payment has not been received
    Unpaid,
    /// Payment received; proofs not yet issued
    Paid,
    /// Proofs already issued against this quote
    Issued,
}

/// Lifecycle of a melt (redemption) quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MeltQuoteState {
    /// Outgoing payment has not been attempted
    Unpaid,
    /// Outgoing payment is in flight
    Pending,
    /// Outgoing payment settled
    Paid,
}

/// `POST /v1/mint/quote/<method>` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintQuoteRequest {
    /// Amount to mint, in `unit`
    pub amount: Amount,
    /// Currency unit
    pub unit: CurrencyUnit,
    /// Optional human-readable description attached to the payment request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `POST /v1/mint/quote/<method>` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintQuoteResponse {
    /// Quote id, referenced by later `POST /v1/mint/<method>` calls
    pub quote: String,
    /// Payment request the wallet must settle (e.g. a BOLT11 invoice)
    pub request: String,
    /// Amount that will be minted once this quote is paid
    pub amount: Amount,
    /// Current quote state
    pub state: MintQuoteState,
    /// Unix timestamp the quote expires at
    pub expiry: u64,
}

/// `POST /v1/mint/<method>` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintRequest {
    /// Quote id being redeemed
    pub quote: String,
    /// Blinded messages to be signed
    pub outputs: Vec<BlindedMessage>,
}

/// `POST /v1/mint/<method>` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintResponse {
    /// Blind signatures, one per submitted output
    pub signatures: Vec<BlindSignature>,
}

/// `POST /v1/melt/quote/<method>` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeltQuoteRequest {
    /// Payment request to be settled (e.g. a BOLT11 invoice)
    pub request: String,
    /// Currency unit of the proofs that will fund it
    pub unit: CurrencyUnit,
}

/// `POST /v1/melt/quote/<method>` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeltQuoteResponse {
    /// Quote id
    pub quote: String,
    /// Amount to be paid out, excluding the mint's fee reserve
    pub amount: Amount,
    /// Fee reserve the wallet must additionally lock up
    pub fee_reserve: Amount,
    /// Current quote state
    pub state: MeltQuoteState,
    /// Unix timestamp the quote expires at
    pub expiry: u64,
    /// Payment proof, once settled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_preimage: Option<String>,
}

/// `POST /v1/melt/<method>` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeltRequest {
    /// Quote id being settled
    pub quote: String,
    /// Inputs funding the payment
    pub inputs: Proofs,
    /// Optional blank outputs for overpaid-fee change (NUT-08)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<BlindedMessage>>,
}

/// `POST /v1/melt/<method>` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeltResponse {
    /// Resulting quote state
    pub state: MeltQuoteState,
    /// Payment proof, if settled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_preimage: Option<String>,
    /// Change signatures against the blank outputs, if any were submitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<Vec<BlindSignature>>,
}

/// `POST /v1/swap` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequest {
    /// Proofs to consume
    pub inputs: Proofs,
    /// Blinded messages to be signed in exchange
    pub outputs: Vec<BlindedMessage>,
}

/// `POST /v1/swap` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapResponse {
    /// Blind signatures, one per submitted output
    pub signatures: Vec<BlindSignature>,
}

/// Spend state of a single proof as reported by `POST /v1/checkstate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProofCheckState {
    /// Not spent
    Unspent,
    /// Reserved by another wallet's in-flight operation
    Pending,
    /// Spent
    Spent,
}

/// One entry of a `POST /v1/checkstate` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofStateEntry {
    /// The `Y` value this entry describes
    #[serde(rename = "Y")]
    pub y: PublicKey,
    /// Its state at the mint
    pub state: ProofCheckState,
}

/// `POST /v1/checkstate` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckStateResponse {
    /// One entry per queried `Y` value, same order as the request
    pub states: Vec<ProofStateEntry>,
}

/// `POST /v1/restore` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreRequest {
    /// Blinded messages to probe
    pub outputs: Vec<BlindedMessage>,
}

/// `POST /v1/restore` response body.
///
/// `outputs`/`signatures` are parallel arrays restricted to the subset of
/// the request the mint actually has a recorded signature for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreResponse {
    /// Outputs the mint recognizes
    pub outputs: Vec<BlindedMessage>,
    /// Their corresponding signatures
    pub signatures: Vec<BlindSignature>,
}

/// Everything the wallet orchestrator needs from a mint, independent of the
/// transport used to reach it.
#[async_trait]
pub trait MintConnector: std::fmt::Debug + Send + Sync {
    /// `GET /v1/info`
    async fn get_mint_info(&self) -> Result<MintInfo, Error>;

    /// `GET /v1/keysets`
    async fn get_mint_keysets(&self) -> Result<KeysetResponse, Error>;

    /// `GET /v1/keys` or `GET /v1/keys/<id>`
    async fn get_mint_keys(&self, id: Option<Id>) -> Result<KeysResponse, Error>;

    /// `POST /v1/mint/quote/<method>`
    async fn post_mint_quote(
        &self,
        method: PaymentMethod,
        request: MintQuoteRequest,
    ) -> Result<MintQuoteResponse, Error>;

    /// `GET /v1/mint/quote/<method>/<quote_id>`
    async fn get_mint_quote_status(
        &self,
        method: PaymentMethod,
        quote_id: &str,
    ) -> Result<MintQuoteResponse, Error>;

    /// `POST /v1/mint/<method>`
    async fn post_mint(&self, method: PaymentMethod, request: MintRequest) -> Result<MintResponse, Error>;

    /// `POST /v1/melt/quote/<method>`
    async fn post_melt_quote(
        &self,
        method: PaymentMethod,
        request: MeltQuoteRequest,
    ) -> Result<MeltQuoteResponse, Error>;

    /// `GET /v1/melt/quote/<method>/<quote_id>`
    async fn get_melt_quote_status(
        &self,
        method: PaymentMethod,
        quote_id: &str,
    ) -> Result<MeltQuoteResponse, Error>;

    /// `POST /v1/melt/<method>`
    async fn post_melt(&self, method: PaymentMethod, request: MeltRequest) -> Result<MeltResponse, Error>;

    /// `POST /v1/swap`
    async fn post_swap(&self, request: SwapRequest) -> Result<SwapResponse, Error>;

    /// `POST /v1/checkstate`
    async fn post_check_state(&self, ys: Vec<PublicKey>) -> Result<CheckStateResponse, Error>;

    /// `POST /v1/restore`
    async fn post_restore(&self, request: RestoreRequest) -> Result<RestoreResponse, Error>;
}
