//! Persistent set of proofs with state tracking.
//!
//! Modeled as an async trait so a concrete implementation may be backed by
//! a database without blocking the orchestrator's executor. The in-process
//! reference implementation serializes access behind a single
//! `tokio::sync::Mutex`, matching the "serialised actor" design note.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::mint_url::MintUrl;
use crate::nuts::{CurrencyUnit, Id, Proof, PublicKey, SpendingConditions};
use crate::wallet::Error;
use crate::Amount;

/// Where a proof sits in its lifecycle: `Available` (default) → `Reserved`
/// (held by an in-flight operation) → `Spent` (mint confirmed), or back to
/// `Available` on rollback. `Spent` is terminal; only `Available` proofs
/// are returned by selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProofState {
    /// Unspent and not held by any in-flight operation
    Available,
    /// Held by an in-flight operation; excluded from selection
    Reserved,
    /// Confirmed spent by the mint; terminal
    Spent,
}

/// A stored proof together with the bookkeeping the wallet needs around it:
/// its `Y` value (used as the store's primary key), originating mint, state
/// and parsed spending condition, if any.
#[derive(Debug, Clone)]
pub struct ProofRecord {
    /// The proof itself
    pub proof: Proof,
    /// `hash_to_curve(proof.secret)`, cached since it's the lookup key
    pub y: PublicKey,
    /// Mint this proof was issued by
    pub mint_url: MintUrl,
    /// Current lifecycle state
    pub state: ProofState,
    /// Parsed P2PK/HTLC condition, if the secret is a well-known secret
    pub spending_condition: Option<SpendingConditions>,
    /// Currency unit of the keyset this proof belongs to
    pub unit: CurrencyUnit,
}

impl ProofRecord {
    /// Build a record from a freshly received proof, deriving `y` and
    /// attempting to parse a spending condition from its secret.
    pub fn new(proof: Proof, mint_url: MintUrl, state: ProofState, unit: CurrencyUnit) -> Result<Self, Error> {
        let y = proof.y()?;
        let spending_condition = SpendingConditions::try_from(&proof.secret).ok();

        Ok(Self {
            proof,
            y,
            mint_url,
            state,
            spending_condition,
            unit,
        })
    }
}

/// Persistent set of proofs supporting the `Available`/`Reserved`/`Spent`
/// lifecycle above.
///
/// All mutating operations are serialized w.r.t. each other; concurrent
/// read-only queries may proceed in parallel but never observe a
/// partially-committed transaction.
#[async_trait]
pub trait ProofStore: std::fmt::Debug + Send + Sync {
    /// Insert proofs as `Available`, rejecting any whose `(keyset_id,
    /// secret)` already exists in the store.
    async fn add(&self, proofs: Vec<ProofRecord>) -> Result<(), Error>;

    /// Remove proofs (by `Y`) from the store entirely, e.g. after the mint
    /// confirms a swap consumed them.
    async fn remove(&self, ys: &[PublicKey]) -> Result<(), Error>;

    /// Whether a proof with this `Y` is tracked
    async fn contains(&self, y: &PublicKey) -> Result<bool, Error>;

    /// Count of tracked proofs, optionally filtered by state
    async fn count(&self, state: Option<ProofState>) -> Result<usize, Error>;

    /// All tracked proofs, optionally filtered by mint, unit and state
    async fn get_all(
        &self,
        mint_url: Option<&MintUrl>,
        unit: Option<CurrencyUnit>,
        state: Option<ProofState>,
    ) -> Result<Vec<ProofRecord>, Error>;

    /// Mark proofs `Reserved`, excluding them from future selection
    async fn mark_reserved(&self, ys: &[PublicKey]) -> Result<(), Error>;

    /// Return reserved proofs to `Available`, e.g. on operation rollback
    async fn mark_available(&self, ys: &[PublicKey]) -> Result<(), Error>;

    /// Mark proofs `Spent`; terminal, never reverted
    async fn mark_spent(&self, ys: &[PublicKey]) -> Result<(), Error>;

    /// Total balance across all unspent (`Available` + `Reserved`) proofs,
    /// optionally scoped to one keyset
    async fn get_balance(&self, keyset_id: Option<Id>) -> Result<Amount, Error>;
}

/// In-memory reference [`ProofStore`], keyed by the proof's `Y` value, held
/// behind a single mutex.
#[derive(Debug, Default)]
pub struct InMemoryProofStore {
    proofs: tokio::sync::Mutex<BTreeMap<PublicKey, ProofRecord>>,
}

impl InMemoryProofStore {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProofStore for InMemoryProofStore {
    async fn add(&self, proofs: Vec<ProofRecord>) -> Result<(), Error> {
        let mut guard = self.proofs.lock().await;
        for record in &proofs {
            if guard.contains_key(&record.y) {
                return Err(Error::DuplicateProof {
                    keyset_id: record.proof.keyset_id.to_string(),
                });
            }
        }
        for record in proofs {
            guard.insert(record.y, record);
        }
        Ok(())
    }

    async fn remove(&self, ys: &[PublicKey]) -> Result<(), Error> {
        let mut guard = self.proofs.lock().await;
        for y in ys {
            guard.remove(y);
        }
        Ok(())
    }

    async fn contains(&self, y: &PublicKey) -> Result<bool, Error> {
        Ok(self.proofs.lock().await.contains_key(y))
    }

    async fn count(&self, state: Option<ProofState>) -> Result<usize, Error> {
        let guard = self.proofs.lock().await;
        Ok(guard
            .values()
            .filter(|r| state.is_none_or(|s| r.state == s))
            .count())
    }

    async fn get_all(
        &self,
        mint_url: Option<&MintUrl>,
        unit: Option<CurrencyUnit>,
        state: Option<ProofState>,
    ) -> Result<Vec<ProofRecord>, Error> {
        let guard = self.proofs.lock().await;
        Ok(guard
            .values()
            .filter(|r| mint_url.is_none_or(|m| &r.mint_url == m))
            .filter(|r| unit.as_ref().is_none_or(|u| &r.unit == u))
            .filter(|r| state.is_none_or(|s| r.state == s))
            .cloned()
            .collect())
    }

    async fn mark_reserved(&self, ys: &[PublicKey]) -> Result<(), Error> {
        self.set_state(ys, ProofState::Reserved).await
    }

    async fn mark_available(&self, ys: &[PublicKey]) -> Result<(), Error> {
        self.set_state(ys, ProofState::Available).await
    }

    async fn mark_spent(&self, ys: &[PublicKey]) -> Result<(), Error> {
        self.set_state(ys, ProofState::Spent).await
    }

    async fn get_balance(&self, keyset_id: Option<Id>) -> Result<Amount, Error> {
        let guard = self.proofs.lock().await;
        let total = guard
            .values()
            .filter(|r| r.state != ProofState::Spent)
            .filter(|r| keyset_id.is_none_or(|id| r.proof.keyset_id == id))
            .try_fold(Amount::ZERO, |acc, r| acc.checked_add(r.proof.amount))?;
        Ok(total)
    }
}

impl InMemoryProofStore {
    async fn set_state(&self, ys: &[PublicKey], state: ProofState) -> Result<(), Error> {
        let mut guard = self.proofs.lock().await;
        for y in ys {
            let record = guard.get_mut(y).ok_or(Error::UnknownProof)?;
            record.state = state;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::nuts::PublicKey as Pk;
    use crate::secret::Secret;

    fn test_record(amount: u64) -> ProofRecord {
        let keyset_id = Id::from_str("009a1f293253e41e").unwrap();
        let c = Pk::from_hex("02194603ffa36356f4a56b7df9371fc3192472351453ec7398b8da8117e7c3e104")
            .unwrap();
        let proof = Proof::new(Amount::from(amount), keyset_id, Secret::generate(), c);
        ProofRecord::new(
            proof,
            MintUrl::from_str("https://mint.example").unwrap(),
            ProofState::Available,
            CurrencyUnit::Sat,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_add_and_balance() {
        let store = InMemoryProofStore::new();
        store.add(vec![test_record(4), test_record(8)]).await.unwrap();
        assert_eq!(store.get_balance(None).await.unwrap(), Amount::from(12));
        assert_eq!(store.count(Some(ProofState::Available)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rejects_duplicate_y() {
        let store = InMemoryProofStore::new();
        let record = test_record(4);
        store.add(vec![record.clone()]).await.unwrap();
        let err = store.add(vec![record]).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateProof { .. }));
    }

    #[tokio::test]
    async fn test_reserve_and_rollback() {
        let store = InMemoryProofStore::new();
        let record = test_record(16);
        let y = record.y;
        store.add(vec![record]).await.unwrap();

        store.mark_reserved(&[y]).await.unwrap();
        assert_eq!(store.count(Some(ProofState::Available)).await.unwrap(), 0);

        store.mark_available(&[y]).await.unwrap();
        assert_eq!(store.count(Some(ProofState::Available)).await.unwrap(), 1);

        store.mark_spent(&[y]).await.unwrap();
        assert_eq!(store.get_balance(None).await.unwrap(), Amount::ZERO);
    }

    #[tokio::test]
    async fn test_double_spend_protection() {
        // Spending the same inputs twice reports AlreadySpent.
        let store = InMemoryProofStore::new();
        let record = test_record(32);
        let y = record.y;
        store.add(vec![record]).await.unwrap();

        store.mark_spent(&[y]).await.unwrap();
        let all = store.get_all(None, None, Some(ProofState::Available)).await.unwrap();
        assert!(all.is_empty(), "spent proof must not be selectable again");
    }
}
