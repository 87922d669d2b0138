//! Active/inactive keyset tracking.
//!
//! Exclusively owns the wallet's view of a mint's keyset table: which
//! keysets exist, which are active per unit, and their full public keys
//! once fetched. Reconciliation against a freshly fetched keyset list goes
//! through [`crate::nuts::nut02::diff_keysets`] rather than reimplementing
//! the comparison here.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::nuts::nut02::diff_keysets;
use crate::nuts::{CurrencyUnit, Id, KeySetInfo, Keys, KeysetSyncDelta};
use crate::wallet::selection::FeeTable;
use crate::wallet::Error;

#[derive(Debug, Default)]
struct State {
    infos: HashMap<Id, KeySetInfo>,
    keys: HashMap<Id, Keys>,
}

/// Tracks known keysets for a single mint and their public keys.
#[derive(Debug, Default)]
pub struct KeysetManager {
    state: Mutex<State>,
}

impl KeysetManager {
    /// An empty manager, no keysets known yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile against a freshly fetched keyset list, returning what
    /// changed. Newly active keysets don't automatically have their keys
    /// fetched; call [`Self::store_keys`] once they're retrieved.
    pub async fn sync(&self, fresh: &[KeySetInfo]) -> KeysetSyncDelta {
        let mut state = self.state.lock().await;
        let known: Vec<KeySetInfo> = state.infos.values().cloned().collect();
        let delta = diff_keysets(&known, fresh);

        for info in fresh {
            state.infos.insert(info.id, info.clone());
        }

        delta
    }

    /// Record the full public keys for a keyset, typically right after
    /// fetching them via `GET /v1/keys/<id>`.
    pub async fn store_keys(&self, id: Id, keys: Keys) {
        self.state.lock().await.keys.insert(id, keys);
    }

    /// Info for a known keyset
    pub async fn info(&self, id: Id) -> Option<KeySetInfo> {
        self.state.lock().await.infos.get(&id).cloned()
    }

    /// Full public keys for a known keyset, if already fetched
    pub async fn keys(&self, id: Id) -> Option<Keys> {
        self.state.lock().await.keys.get(&id).cloned()
    }

    /// The single active keyset for `unit` (at most one active keyset per
    /// unit is assumed; the first match wins if a mint violates that).
    pub async fn active_for_unit(&self, unit: CurrencyUnit) -> Result<KeySetInfo, Error> {
        self.state
            .lock()
            .await
            .infos
            .values()
            .find(|info| info.unit == unit && info.active)
            .cloned()
            .ok_or(Error::NoActiveKeyset)
    }

    /// All known keyset ids, active or not. Restoration needs to probe
    /// retired keysets too: a wallet may hold proofs minted before the
    /// mint rotated to a new active keyset.
    pub async fn known_ids(&self) -> Vec<Id> {
        self.state.lock().await.infos.keys().copied().collect()
    }

    /// Per-keyset `input_fee_ppk` table covering every known keyset, in the
    /// shape [`crate::wallet::selection::select_proofs`] expects.
    pub async fn fee_table(&self) -> FeeTable {
        self.state
            .lock()
            .await
            .infos
            .values()
            .map(|info| (info.id, info.input_fee_ppk))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn info(id: &str, unit: CurrencyUnit, active: bool, fee_ppk: u64) -> KeySetInfo {
        KeySetInfo {
            id: Id::from_str(id).unwrap(),
            unit,
            active,
            input_fee_ppk: fee_ppk,
        }
    }

    #[tokio::test]
    async fn test_sync_reports_newly_active_and_inactive() {
        let manager = KeysetManager::new();
        let first = vec![info("009a1f293253e41e", CurrencyUnit::Sat, true, 0)];
        let delta = manager.sync(&first).await;
        assert_eq!(delta.newly_seen.len(), 1);
        assert_eq!(delta.newly_active.len(), 1);

        let second = vec![info("009a1f293253e41e", CurrencyUnit::Sat, false, 0)];
        let delta = manager.sync(&second).await;
        assert_eq!(delta.newly_inactive.len(), 1);

        let err = manager.active_for_unit(CurrencyUnit::Sat).await.unwrap_err();
        assert!(matches!(err, Error::NoActiveKeyset));
    }

    #[tokio::test]
    async fn test_fee_table_reflects_known_keysets() {
        let manager = KeysetManager::new();
        manager
            .sync(&[info("009a1f293253e41e", CurrencyUnit::Sat, true, 100)])
            .await;
        let table = manager.fee_table().await;
        assert_eq!(
            table.get(&Id::from_str("009a1f293253e41e").unwrap()),
            Some(&100)
        );
    }
}
