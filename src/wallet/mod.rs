//! Wallet orchestrator: the stateful core tying the proof store, counter
//! manager, keyset manager and a mint connection together into the five
//! operations a Cashu wallet performs.
//!
//! A [`Wallet`] is a single logical owner over one mint/unit pair: all
//! mutations to its proof store, counter store and keyset table are
//! serialized by those components' own internal locks, and every operation
//! is backed by a [`saga::WalletSaga`] so a crash mid-operation leaves
//! recoverable state rather than stuck, silently-reserved proofs.

use std::sync::Arc;

use bip39::Mnemonic;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use zeroize::Zeroize;

pub mod connector;
pub mod counter;
pub mod error;
pub mod keyset_manager;
pub mod mint_info;
pub mod proof_store;
pub mod restore;
pub mod saga;
pub mod selection;
pub mod transaction;

pub use connector::{MeltQuoteState, MintConnector, MintQuoteState};
pub use counter::{CounterStore, InMemoryCounterStore};
pub use error::Error;
pub use keyset_manager::KeysetManager;
pub use proof_store::{InMemoryProofStore, ProofRecord, ProofState, ProofStore};
pub use saga::{InMemorySagaStore, OperationData, SagaStore, WalletSaga, WalletSagaState};
pub use transaction::{Transaction, TransactionDirection, TransactionId};

use crate::dhke::construct_proofs;
use crate::nuts::nut12::verify_carol;
use crate::nuts::{CurrencyUnit, PaymentMethod, PreMintSecrets, Proof, Proofs, ProofsMethods, Token};
use crate::mint_url::MintUrl;
use crate::Amount;

use connector::{MeltQuoteResponse, MeltRequest, MintQuoteRequest, MintQuoteResponse, MintRequest, SwapRequest};

/// Which of the five operations a [`WalletSaga`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Issuance against a paid mint quote
    Mint,
    /// Paying out a token to a third party
    Send,
    /// Redeeming a token received from a third party
    Receive,
    /// Paying a Lightning invoice (or other payment request) from proofs
    Melt,
    /// Exchanging proofs for a fresh, unlinkable set
    Swap,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mint => write!(f, "mint"),
            Self::Send => write!(f, "send"),
            Self::Receive => write!(f, "receive"),
            Self::Melt => write!(f, "melt"),
            Self::Swap => write!(f, "swap"),
        }
    }
}

/// A BIP-39 seed, held for the lifetime of a [`Wallet`] and zeroized on
/// drop. `Debug` is redacted so a seed never ends up in a log line.
pub struct Seed([u8; 64]);

impl Seed {
    /// Derive a seed from a mnemonic and optional BIP-39 passphrase.
    pub fn new(mnemonic: &Mnemonic, passphrase: &str) -> Self {
        Self(mnemonic.to_seed(passphrase))
    }

    fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Seed(..)")
    }
}

impl Drop for Seed {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// The wallet orchestrator for a single mint/unit pair.
#[derive(Debug)]
pub struct Wallet {
    mint_url: MintUrl,
    unit: CurrencyUnit,
    seed: Seed,
    proof_store: Arc<dyn ProofStore>,
    counter_store: Arc<dyn CounterStore>,
    saga_store: Arc<dyn SagaStore>,
    connector: Arc<dyn MintConnector>,
    keysets: KeysetManager,
    balance_tx: broadcast::Sender<Amount>,
}

impl Wallet {
    /// Construct a wallet. The seed is derived once here and held for the
    /// wallet's lifetime; no later call re-derives it from the mnemonic.
    pub fn new(
        mint_url: MintUrl,
        unit: CurrencyUnit,
        mnemonic: &Mnemonic,
        proof_store: Arc<dyn ProofStore>,
        counter_store: Arc<dyn CounterStore>,
        saga_store: Arc<dyn SagaStore>,
        connector: Arc<dyn MintConnector>,
    ) -> Self {
        let (balance_tx, _) = broadcast::channel(16);
        Self {
            mint_url,
            unit,
            seed: Seed::new(mnemonic, ""),
            proof_store,
            counter_store,
            saga_store,
            connector,
            keysets: KeysetManager::new(),
            balance_tx,
        }
    }

    /// Total unspent balance held by this wallet.
    pub async fn balance(&self) -> Result<Amount, Error> {
        Ok(self.proof_store.get_balance(None).await?)
    }

    /// A receiver fed with the new balance every time an operation commits
    /// proofs.
    pub fn subscribe_balance(&self) -> broadcast::Receiver<Amount> {
        self.balance_tx.subscribe()
    }

    /// Refresh the local keyset table against the mint and fetch public
    /// keys for any newly seen keyset.
    pub async fn refresh_keysets(&self) -> Result<(), Error> {
        let fresh = self.connector.get_mint_keysets().await?;
        let delta = self.keysets.sync(&fresh.keysets).await;
        for id in delta.newly_seen {
            let response = self.connector.get_mint_keys(Some(id)).await?;
            if let Some(keyset) = response.keysets.into_iter().find(|k| k.id == id) {
                self.keysets.store_keys(id, keyset.keys).await;
            }
        }
        Ok(())
    }

    async fn reserve_outputs(&self, amount: Amount) -> Result<(crate::nuts::Id, PreMintSecrets, u32, u32), Error> {
        self.reserve_outputs_for_amounts(&amount.split()).await
    }

    async fn reserve_outputs_for_amounts(
        &self,
        amounts: &[Amount],
    ) -> Result<(crate::nuts::Id, PreMintSecrets, u32, u32), Error> {
        let active = self.keysets.active_for_unit(self.unit.clone()).await?;
        let start = self.counter_store.reserve(active.id, amounts.len() as u32).await?;
        let end = start + amounts.len() as u32;
        let secrets = PreMintSecrets::from_seed(active.id, start, self.seed.as_bytes(), amounts)?;
        Ok((active.id, secrets, start, end))
    }

    async fn unblind_and_verify(
        &self,
        active_id: crate::nuts::Id,
        signatures: Vec<crate::nuts::BlindSignature>,
        secrets: &PreMintSecrets,
    ) -> Result<Proofs, Error> {
        let keys = self
            .keysets
            .keys(active_id)
            .await
            .ok_or(Error::NoActiveKeyset)?;
        let proofs = construct_proofs(signatures, secrets.rs(), secrets.secrets(), &keys)?;

        for proof in &proofs {
            if let (Some(dleq), Some(amount_key)) = (&proof.dleq, keys.amount_key(proof.amount)) {
                if !verify_carol(&proof.secret, &proof.c, dleq, &amount_key)? {
                    return Err(Error::SpendConditionsNotMet("invalid DLEQ proof".into()));
                }
            }
        }
        Ok(proofs)
    }

    async fn commit_proofs(&self, proofs: Proofs, unit: CurrencyUnit) -> Result<(), Error> {
        let mut records = Vec::with_capacity(proofs.len());
        for proof in proofs {
            records.push(ProofRecord::new(
                proof,
                self.mint_url.clone(),
                ProofState::Available,
                unit.clone(),
            )?);
        }
        self.proof_store.add(records).await?;
        let balance = self.balance().await?;
        let _ = self.balance_tx.send(balance);
        Ok(())
    }

    /// `Idle → RequestQuote → AwaitPayment`: request a mint quote. The
    /// caller is responsible for presenting `request` (e.g. a BOLT11
    /// invoice) to the payer; settlement itself is out of scope.
    pub async fn request_mint_quote(&self, amount: Amount, description: Option<String>) -> Result<MintQuoteResponse, Error> {
        Ok(self
            .connector
            .post_mint_quote(
                PaymentMethod::Bolt11,
                MintQuoteRequest {
                    amount,
                    unit: self.unit.clone(),
                    description,
                },
            )
            .await?)
    }

    /// `GenerateOutputs → SubmitMint → Unblind+VerifyDLEQ → CommitProofs`:
    /// redeem a paid mint quote for proofs. Errors with [`Error::QuoteExpired`]
    /// if the mint still reports the quote unpaid.
    pub async fn mint(&self, quote: &MintQuoteResponse) -> Result<Proofs, Error> {
        let status = self
            .connector
            .get_mint_quote_status(PaymentMethod::Bolt11, &quote.quote)
            .await?;
        if status.state == MintQuoteState::Unpaid {
            return Err(Error::QuoteExpired);
        }

        let amount = quote.amount;
        let (active_id, secrets, start, end) = self.reserve_outputs(amount).await?;

        let saga_id = uuid::Uuid::new_v4();
        let mut saga = WalletSaga::new(
            saga_id,
            WalletSagaState::Mint(saga::MintSagaState::OutputsGenerated),
            amount,
            self.mint_url.clone(),
            self.unit.clone(),
            OperationData::Mint(saga::MintOperationData {
                quote_id: quote.quote.clone(),
                amount,
                counter_start: start,
                counter_end: end,
                blinded_messages: secrets.blinded_messages.clone(),
            }),
        );
        self.saga_store.insert(saga.clone()).await?;

        let result = self
            .connector
            .post_mint(
                PaymentMethod::Bolt11,
                MintRequest {
                    quote: quote.quote.clone(),
                    outputs: secrets.blinded_messages.clone(),
                },
            )
            .await;

        let signatures = match result {
            Ok(response) => response.signatures,
            Err(err) => {
                self.counter_store.set(active_id, start).await?;
                return Err(err);
            }
        };

        saga.update_state(WalletSagaState::Mint(saga::MintSagaState::MintSubmitted));
        self.saga_store.update(saga.clone()).await?;

        let proofs = self.unblind_and_verify(active_id, signatures, &secrets).await?;
        self.commit_proofs(proofs.clone(), self.unit.clone()).await?;
        self.saga_store.remove(saga_id).await?;

        Ok(proofs)
    }

    /// `Idle → SelectInputs → Swap → EncodeToken → Commit(change)`: send
    /// `amount` to a third party, returning a token they can redeem.
    pub async fn send(&self, amount: Amount, memo: Option<String>) -> Result<Token, Error> {
        let fee_table = self.keysets.fee_table().await;
        let available = self
            .proof_store
            .get_all(Some(&self.mint_url), Some(self.unit.clone()), Some(ProofState::Available))
            .await?
            .into_iter()
            .map(|r| r.proof)
            .collect::<Vec<_>>();

        let selected = selection::select_proofs(&available, amount, &fee_table)?;
        let ys = selected.iter().map(|p| p.y()).collect::<Result<Vec<_>, _>>()?;
        self.proof_store.mark_reserved(&ys).await?;

        let saga_id = uuid::Uuid::new_v4();
        let mut saga = WalletSaga::new(
            saga_id,
            WalletSagaState::Send(saga::SendSagaState::InputsReserved),
            amount,
            self.mint_url.clone(),
            self.unit.clone(),
            OperationData::Send(saga::SendOperationData {
                amount,
                memo: memo.clone(),
                counter_start: None,
                counter_end: None,
                token: None,
                proofs: selected.clone(),
            }),
        );
        self.saga_store.insert(saga.clone()).await?;

        let fee = selection::fee_for_inputs(&selected, &fee_table);
        let input_total = match Amount::try_sum(selected.iter().map(|p| p.amount)) {
            Ok(total) => total,
            Err(err) => {
                self.proof_store.mark_available(&ys).await?;
                self.saga_store.remove(saga_id).await?;
                return Err(err.into());
            }
        };
        let change_amount = match input_total.checked_sub(amount).and_then(|r| r.checked_sub(fee)) {
            Some(change) => change,
            None => {
                self.proof_store.mark_available(&ys).await?;
                self.saga_store.remove(saga_id).await?;
                return Err(Error::InsufficientBalance);
            }
        };

        let send_amounts = amount.split();
        let change_amounts = change_amount.split();
        let split_point = send_amounts.len();
        let all_amounts = [send_amounts, change_amounts].concat();

        let swap_result = self.execute_swap(&selected, &all_amounts).await;
        let mut proofs = match swap_result {
            Ok(proofs) => proofs,
            Err(err) => {
                self.proof_store.mark_available(&ys).await?;
                self.saga_store.remove(saga_id).await?;
                return Err(err);
            }
        };

        let change = proofs.split_off(split_point);
        let to_send = proofs;

        self.proof_store.remove(&ys).await?;
        if !change.is_empty() {
            self.commit_proofs(change, self.unit.clone()).await?;
        }
        saga.update_state(WalletSagaState::Send(saga::SendSagaState::TokenEncoded));
        self.saga_store.update(saga.clone()).await?;

        let token = Token::new(self.mint_url.clone(), to_send, memo, self.unit.clone());
        self.saga_store.remove(saga_id).await?;
        let balance = self.balance().await?;
        let _ = self.balance_tx.send(balance);
        Ok(token)
    }

    /// `Idle → DecodeToken → Validate → Swap → CommitProofs`: redeem a
    /// token received from a third party. Swapping (rather than trusting
    /// the token's proofs directly) defeats a sender who kept a copy and
    /// tries to double-spend it elsewhere.
    pub async fn receive(&self, token: &Token) -> Result<Amount, Error> {
        if token.mint_url()? != self.mint_url {
            return Err(Error::NoActiveKeyset);
        }
        let proofs = token.proofs();
        if proofs.is_empty() {
            return Err(Error::NoSpendableProofs);
        }

        let amount = proofs.total_amount()?;
        let fee_table = self.keysets.fee_table().await;

        let saga_id = uuid::Uuid::new_v4();
        let saga = WalletSaga::new(
            saga_id,
            WalletSagaState::Receive(saga::ReceiveSagaState::TokenDecoded),
            amount,
            self.mint_url.clone(),
            self.unit.clone(),
            OperationData::Receive(saga::ReceiveOperationData {
                token: token.clone(),
                counter_start: 0,
                counter_end: 0,
                amount,
                blinded_messages: Vec::new(),
            }),
        );
        self.saga_store.insert(saga.clone()).await?;

        let received = self.swap_inner(&proofs, &fee_table).await?;
        let received_amount = received.total_amount()?;
        self.commit_proofs(received, self.unit.clone()).await?;
        self.saga_store.remove(saga_id).await?;

        Ok(received_amount)
    }

    /// Exchange `inputs` for fresh proofs of the same total value minus fee,
    /// used internally by [`Self::send`]/[`Self::receive`] and also exposed
    /// directly for standalone swaps.
    pub async fn swap(&self, inputs: Proofs) -> Result<Proofs, Error> {
        let fee_table = self.keysets.fee_table().await;
        self.swap_inner(&inputs, &fee_table).await
    }

    async fn swap_inner(&self, inputs: &[Proof], fee_table: &selection::FeeTable) -> Result<Proofs, Error> {
        let fee = selection::fee_for_inputs(inputs, fee_table);
        let output_amount = Amount::try_sum(inputs.iter().map(|p| p.amount))?
            .checked_sub(fee)
            .ok_or(Error::InsufficientBalance)?;
        selection::balances(inputs, output_amount, fee)?;
        self.execute_swap(inputs, &output_amount.split()).await
    }

    /// Submit a swap producing outputs of exactly `output_amounts` (in
    /// order), rolling the reserved counter range back if the mint rejects
    /// the request.
    async fn execute_swap(&self, inputs: &[Proof], output_amounts: &[Amount]) -> Result<Proofs, Error> {
        let (active_id, secrets, start, _end) = self.reserve_outputs_for_amounts(output_amounts).await?;

        let result = self
            .connector
            .post_swap(SwapRequest {
                inputs: inputs.to_vec(),
                outputs: secrets.blinded_messages.clone(),
            })
            .await;

        let signatures = match result {
            Ok(response) => response.signatures,
            Err(err) => {
                self.counter_store.set(active_id, start).await?;
                return Err(err);
            }
        };

        self.unblind_and_verify(active_id, signatures, &secrets).await
    }

    /// `Idle → RequestMeltQuote`: quote the cost of paying `request`.
    pub async fn request_melt_quote(&self, request: String) -> Result<MeltQuoteResponse, Error> {
        Ok(self
            .connector
            .post_melt_quote(
                PaymentMethod::Bolt11,
                connector::MeltQuoteRequest { request, unit: self.unit.clone() },
            )
            .await?)
    }

    /// `SelectInputs → SubmitMelt → On PAID: Commit; On UNPAID/FAILED:
    /// Rollback`: pay out a melt quote from the wallet's proofs.
    pub async fn melt(&self, quote: &MeltQuoteResponse) -> Result<(), Error> {
        let fee_table = self.keysets.fee_table().await;
        let required = quote.amount.checked_add(quote.fee_reserve)?;

        let available = self
            .proof_store
            .get_all(Some(&self.mint_url), Some(self.unit.clone()), Some(ProofState::Available))
            .await?
            .into_iter()
            .map(|r| r.proof)
            .collect::<Vec<_>>();
        let selected = selection::select_proofs(&available, required, &fee_table)?;
        let ys = selected.iter().map(|p| p.y()).collect::<Result<Vec<_>, _>>()?;
        self.proof_store.mark_reserved(&ys).await?;

        let saga_id = uuid::Uuid::new_v4();
        let mut saga = WalletSaga::new(
            saga_id,
            WalletSagaState::Melt(saga::MeltSagaState::InputsReserved),
            quote.amount,
            self.mint_url.clone(),
            self.unit.clone(),
            OperationData::Melt(saga::MeltOperationData {
                quote_id: quote.quote.clone(),
                amount: quote.amount,
                fee_reserve: quote.fee_reserve,
                counter_start: None,
                counter_end: None,
                change_amount: None,
                change_blinded_messages: Vec::new(),
            }),
        );
        self.saga_store.insert(saga.clone()).await?;

        let result = self
            .connector
            .post_melt(
                PaymentMethod::Bolt11,
                MeltRequest {
                    quote: quote.quote.clone(),
                    inputs: selected.clone(),
                    outputs: None,
                },
            )
            .await;

        match result {
            Ok(response) if response.state == MeltQuoteState::Paid => {
                self.proof_store.mark_spent(&ys).await?;
                saga.update_state(WalletSagaState::Melt(saga::MeltSagaState::MeltSubmitted));
                self.saga_store.update(saga.clone()).await?;
                self.saga_store.remove(saga_id).await?;
                let balance = self.balance().await?;
                let _ = self.balance_tx.send(balance);
                Ok(())
            }
            Ok(response) if response.state == MeltQuoteState::Pending => {
                saga.update_state(WalletSagaState::Melt(saga::MeltSagaState::PaymentPending));
                self.saga_store.update(saga.clone()).await?;
                Err(Error::QuoteUnknown)
            }
            Ok(_) | Err(_) => {
                self.proof_store.mark_available(&ys).await?;
                self.saga_store.remove(saga_id).await?;
                Err(Error::AlreadySpent)
            }
        }
    }
}

