//! Pessimistic, in-process transactional store.
//!
//! One write transaction at a time: `begin` takes the write gate without
//! blocking and a second writer gets a retryable [`StoreError::Conflict`].
//! The transaction stages a working copy of the committed state; `commit`
//! publishes it atomically, and dropping the transaction without committing
//! rolls everything back. Committed reads never block on a writer and never
//! observe uncommitted entries.

use std::sync::{Mutex, MutexGuard, RwLock, TryLockError};

use thiserror::Error;

use crate::state::StoreState;

/// Store-level failure, kept apart from domain errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another transaction holds the store; safe to retry the whole batch.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// A lock was poisoned by a panicking writer.
    #[error("store poisoned: {0}")]
    Poisoned(String),
}

/// In-memory store with a single committed state.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    committed: RwLock<StoreState>,
    write_gate: Mutex<()>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a write transaction.
    ///
    /// At most one is in flight at a time; contention is surfaced
    /// immediately instead of blocking so callers can retry from scratch.
    pub fn begin(&self) -> Result<StoreTransaction<'_>, StoreError> {
        let gate = match self.write_gate.try_lock() {
            Ok(gate) => gate,
            Err(TryLockError::WouldBlock) => {
                return Err(StoreError::Conflict(
                    "another transaction is in flight".to_string(),
                ));
            }
            Err(TryLockError::Poisoned(_)) => {
                return Err(StoreError::Poisoned("write gate".to_string()));
            }
        };

        let working = self
            .committed
            .read()
            .map_err(|_| StoreError::Poisoned("committed state".to_string()))?
            .clone();

        Ok(StoreTransaction {
            _gate: gate,
            store: self,
            working,
        })
    }

    /// Run a read-only closure over the committed state.
    pub fn with_snapshot<T>(&self, f: impl FnOnce(&StoreState) -> T) -> Result<T, StoreError> {
        let state = self
            .committed
            .read()
            .map_err(|_| StoreError::Poisoned("committed state".to_string()))?;
        Ok(f(&state))
    }
}

/// A staged working copy of the store.
///
/// No custom `Drop`: abandoning the value *is* the rollback.
#[derive(Debug)]
pub struct StoreTransaction<'a> {
    _gate: MutexGuard<'a, ()>,
    store: &'a InMemoryStore,
    working: StoreState,
}

impl StoreTransaction<'_> {
    pub fn state(&self) -> &StoreState {
        &self.working
    }

    pub fn state_mut(&mut self) -> &mut StoreState {
        &mut self.working
    }

    /// Publish the working copy atomically.
    pub fn commit(self) -> Result<(), StoreError> {
        let mut committed = self
            .store
            .committed
            .write()
            .map_err(|_| StoreError::Poisoned("committed state".to_string()))?;
        *committed = self.working;
        tracing::debug!("store transaction committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lootpool_core::{InventoryItemId, ItemTypeId, LocationId, Money};
    use lootpool_inventory::InventoryItem;
    use lootpool_ledger::{EntryKind, LedgerAccount, LedgerEntry};

    fn test_item() -> InventoryItem {
        InventoryItem::new(
            InventoryItemId::new(),
            ItemTypeId::new(),
            LocationId::new(),
            None,
            5,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn commit_publishes_the_working_copy() {
        let store = InMemoryStore::new();
        let item = test_item();

        let mut tx = store.begin().unwrap();
        tx.state_mut().upsert_item(item.clone());
        tx.commit().unwrap();

        let found = store
            .with_snapshot(|s| s.item(item.id_typed()).cloned())
            .unwrap();
        assert_eq!(found, Some(item));
    }

    #[test]
    fn dropping_a_transaction_rolls_back() {
        let store = InMemoryStore::new();
        let item = test_item();

        {
            let mut tx = store.begin().unwrap();
            tx.state_mut().upsert_item(item.clone());
            // no commit
        }

        let found = store
            .with_snapshot(|s| s.item(item.id_typed()).cloned())
            .unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn a_second_writer_conflicts_instead_of_blocking() {
        let store = InMemoryStore::new();

        let _tx = store.begin().unwrap();
        let err = store.begin().unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn snapshots_never_see_uncommitted_entries() {
        let store = InMemoryStore::new();
        let item = test_item();

        let mut tx = store.begin().unwrap();
        tx.state_mut().append_entry(LedgerEntry::post(
            LedgerAccount::Pool(item.id_typed()),
            Money::new(1000),
            EntryKind::GrossProfit,
            5,
            "",
            Utc::now(),
        ));

        let balance = store
            .with_snapshot(|s| s.ledger().pool_balance(item.id_typed()))
            .unwrap();
        assert_eq!(balance, 0);

        tx.commit().unwrap();
        let balance = store
            .with_snapshot(|s| s.ledger().pool_balance(item.id_typed()))
            .unwrap();
        assert_eq!(balance, 1000);
    }
}
