//! In-process sequence store.
//!
//! Used when no database URL is configured and by the integration tests. It
//! mirrors the Postgres adapter's guarantees:
//!
//! - scope locks are per scope, re-entrant within a transaction and bounded
//!   by a lock timeout that surfaces as a conflict;
//! - writes are buffered per transaction and checked for `(scope, sequence)`
//!   uniqueness after every statement;
//! - an item recorded twice in one list is a conflict: another transaction
//!   sequenced it between this one's read and its commit;
//! - commit replays the buffered writes onto the shared table; an `Err` from
//!   the unit of work drops them.
//!
//! Reads inside a transaction see committed rows overlaid with the
//! transaction's own buffered writes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::domain::ports::{
    SequenceStore, SequenceStoreError, SequenceTransaction, TransactionFuture,
};
use crate::domain::sequencing::{
    ItemRef, ScopeKey, SequenceError, SequenceWrite, SequencedItem,
};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct Shared {
    rows: Mutex<Vec<SequencedItem>>,
    scope_locks: Mutex<HashMap<ScopeKey, Arc<Mutex<()>>>>,
    failure_countdown: Mutex<Option<u64>>,
}

/// Sequence store backed by process memory.
///
/// # Examples
/// ```
/// use std::time::Duration;
///
/// use lms_backend::outbound::memory::InMemorySequenceStore;
///
/// let store = InMemorySequenceStore::default().with_lock_timeout(Duration::from_millis(250));
/// ```
#[derive(Clone)]
pub struct InMemorySequenceStore {
    shared: Arc<Shared>,
    lock_timeout: Duration,
}

impl Default for InMemorySequenceStore {
    fn default() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl InMemorySequenceStore {
    /// Bound how long a transaction waits for a scope lock.
    #[must_use]
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Make the `nth` write from now (1-based) fail once with a query error.
    ///
    /// Lets tests observe rollback of partially applied plans.
    pub async fn fail_on_write(&self, nth: u64) {
        *self.shared.failure_countdown.lock().await = Some(nth.max(1));
    }

    /// Every committed row, in insertion order.
    pub async fn snapshot(&self) -> Vec<SequencedItem> {
        self.shared.rows.lock().await.clone()
    }
}

#[async_trait]
impl SequenceStore for InMemorySequenceStore {
    async fn with_transaction<T, F>(&self, work: F) -> Result<T, SequenceError>
    where
        T: Send + 'static,
        F: for<'t> FnOnce(&'t mut dyn SequenceTransaction) -> TransactionFuture<'t, T>
            + Send
            + 'static,
    {
        let mut tx = MemoryTransaction {
            shared: &self.shared,
            lock_timeout: self.lock_timeout,
            pending: Vec::new(),
            locked: HashSet::new(),
            guards: Vec::new(),
        };
        let outcome = work(&mut tx).await;
        match outcome {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(error) => {
                debug!(
                    discarded = tx.pending.len(),
                    %error,
                    "rolling back in-memory transaction"
                );
                Err(error)
            }
        }
    }

    async fn find_active_by_scope(
        &self,
        scope: &ScopeKey,
    ) -> Result<Vec<SequencedItem>, SequenceStoreError> {
        Ok(scope_rows(&self.shared.rows.lock().await, scope))
    }

    async fn find_item(&self, item: &ItemRef) -> Result<Option<SequencedItem>, SequenceStoreError> {
        Ok(find_row(&self.shared.rows.lock().await, item))
    }
}

struct MemoryTransaction<'s> {
    shared: &'s Shared,
    lock_timeout: Duration,
    pending: Vec<SequenceWrite>,
    locked: HashSet<ScopeKey>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl MemoryTransaction<'_> {
    async fn view(&self) -> Vec<SequencedItem> {
        let mut rows = self.shared.rows.lock().await.clone();
        for write in &self.pending {
            write.apply_to(&mut rows);
        }
        rows
    }

    async fn take_injected_failure(&self) -> Result<(), SequenceStoreError> {
        let mut countdown = self.shared.failure_countdown.lock().await;
        match countdown.as_mut() {
            Some(remaining) if *remaining <= 1 => {
                *countdown = None;
                Err(SequenceStoreError::query("injected write failure"))
            }
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn commit(self) -> Result<(), SequenceStoreError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let mut rows = self.shared.rows.lock().await;
        let mut next = rows.clone();
        for write in &self.pending {
            write.apply_to(&mut next);
            check_unique(&next)?;
        }
        *rows = next;
        debug!(writes = self.pending.len(), "committed in-memory transaction");
        Ok(())
    }
}

#[async_trait]
impl SequenceTransaction for MemoryTransaction<'_> {
    async fn lock_scope(&mut self, scope: &ScopeKey) -> Result<(), SequenceStoreError> {
        if self.locked.contains(scope) {
            return Ok(());
        }
        let lock = {
            let mut locks = self.shared.scope_locks.lock().await;
            Arc::clone(locks.entry(*scope).or_default())
        };
        let guard = tokio::time::timeout(self.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                SequenceStoreError::conflict(format!("timed out waiting for lock on {scope}"))
            })?;
        self.guards.push(guard);
        self.locked.insert(*scope);
        Ok(())
    }

    async fn peek_item(
        &mut self,
        item: &ItemRef,
    ) -> Result<Option<SequencedItem>, SequenceStoreError> {
        Ok(find_row(&self.view().await, item))
    }

    async fn find_item(
        &mut self,
        item: &ItemRef,
    ) -> Result<Option<SequencedItem>, SequenceStoreError> {
        Ok(find_row(&self.view().await, item))
    }

    async fn find_active_by_scope(
        &mut self,
        scope: &ScopeKey,
    ) -> Result<Vec<SequencedItem>, SequenceStoreError> {
        Ok(scope_rows(&self.view().await, scope))
    }

    async fn apply(&mut self, write: &SequenceWrite) -> Result<u64, SequenceStoreError> {
        self.take_injected_failure().await?;
        let mut rows = self.view().await;
        let touched = write.apply_to(&mut rows);
        check_unique(&rows)?;
        self.pending.push(*write);
        Ok(touched)
    }
}

fn find_row(rows: &[SequencedItem], item: &ItemRef) -> Option<SequencedItem> {
    rows.iter().find(|row| row.item_ref() == *item).copied()
}

fn scope_rows(rows: &[SequencedItem], scope: &ScopeKey) -> Vec<SequencedItem> {
    let mut items: Vec<SequencedItem> = rows
        .iter()
        .filter(|row| row.scope == *scope && row.is_positioned())
        .copied()
        .collect();
    items.sort_by_key(|item| item.sequence);
    items
}

fn check_unique(rows: &[SequencedItem]) -> Result<(), SequenceStoreError> {
    let mut keys = HashSet::with_capacity(rows.len());
    let mut positions = HashSet::with_capacity(rows.len());
    for row in rows {
        if !keys.insert(row.item_ref()) {
            return Err(SequenceStoreError::conflict(format!(
                "{} was sequenced by a concurrent transaction",
                row.item_ref()
            )));
        }
        if row.is_positioned() && !positions.insert((row.scope, row.sequence)) {
            return Err(SequenceStoreError::constraint(format!(
                "sequence {} is already taken in {}",
                row.sequence, row.scope
            )));
        }
    }
    Ok(())
}
