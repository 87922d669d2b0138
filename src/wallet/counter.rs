//! Per-keyset derivation counters.
//!
//! Counters advance only after the corresponding mint/swap succeeds; on
//! failure the counter is restored to its pre-operation value. Modeled as
//! an async trait for the same reason as [`super::proof_store::ProofStore`]:
//! a concrete implementation may persist to a database.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::nuts::Id;
use crate::wallet::Error;

/// `{keyset_id → u32}` counter table driving NUT-13 secret derivation.
#[async_trait]
pub trait CounterStore: std::fmt::Debug + Send + Sync {
    /// Next unused counter value for `keyset_id` (0 if never used)
    async fn get(&self, keyset_id: Id) -> Result<u32, Error>;

    /// Reserve `count` consecutive counter values starting at the current
    /// value, advance the stored counter past them, and return the start.
    async fn reserve(&self, keyset_id: Id, count: u32) -> Result<u32, Error>;

    /// Overwrite the counter, e.g. during restoration
    async fn set(&self, keyset_id: Id, value: u32) -> Result<(), Error>;

    /// Reset a keyset's counter to zero
    async fn reset(&self, keyset_id: Id) -> Result<(), Error>;
}

/// In-memory reference [`CounterStore`].
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    counters: tokio::sync::Mutex<HashMap<Id, u32>>,
}

impl InMemoryCounterStore {
    /// An empty store, all counters starting at zero
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn get(&self, keyset_id: Id) -> Result<u32, Error> {
        Ok(*self.counters.lock().await.get(&keyset_id).unwrap_or(&0))
    }

    async fn reserve(&self, keyset_id: Id, count: u32) -> Result<u32, Error> {
        let mut guard = self.counters.lock().await;
        let start = *guard.get(&keyset_id).unwrap_or(&0);
        guard.insert(keyset_id, start + count);
        Ok(start)
    }

    async fn set(&self, keyset_id: Id, value: u32) -> Result<(), Error> {
        self.counters.lock().await.insert(keyset_id, value);
        Ok(())
    }

    async fn reset(&self, keyset_id: Id) -> Result<(), Error> {
        self.counters.lock().await.remove(&keyset_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn test_keyset() -> Id {
        Id::from_str("009a1f293253e41e").unwrap()
    }

    #[tokio::test]
    async fn test_reserve_advances_and_returns_start() {
        let store = InMemoryCounterStore::new();
        let id = test_keyset();

        assert_eq!(store.reserve(id, 3).await.unwrap(), 0);
        assert_eq!(store.get(id).await.unwrap(), 3);
        assert_eq!(store.reserve(id, 2).await.unwrap(), 3);
        assert_eq!(store.get(id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_failed_operation_restores_counter() {
        let store = InMemoryCounterStore::new();
        let id = test_keyset();

        let start = store.reserve(id, 5).await.unwrap();
        // Simulate a failed mint/swap: restore the counter to its
        // pre-operation value instead of leaving the reservation advanced.
        store.set(id, start).await.unwrap();

        assert_eq!(store.get(id).await.unwrap(), 0);
    }
}
