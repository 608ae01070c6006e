//! Sequencer service implementing the sequencing driving ports.
//!
//! Every operation reads, plans and writes inside one store transaction. The
//! scope of the target item is locked before anything is planned, so two
//! operations on the same scope run one after the other while operations on
//! different scopes proceed in parallel. An item's scope is read once before
//! locking and again after; if it changed in between the operation is
//! reported as a conflict instead of planning against a stale scope.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::plan::{
    SequencePlan, plan_append, plan_deactivate, plan_move_across, plan_move_within,
    plan_reactivate, plan_remove,
};
use super::{ItemRef, ScopeKey, ScopeShape, SequenceError, SequenceWrite, SequencedItem};
use crate::domain::Error;
use crate::domain::ports::{
    AppendItemRequest, MoveItemRequest, SequenceStore, SequenceTransaction, SequencingCommand,
    SequencingQuery, TransferItemRequest,
};

/// Keeps the ordering of every sequenced list dense and gapless.
///
/// # Examples
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use lms_backend::domain::sequencing::{ScopeKey, SequenceList, Sequencer};
/// use lms_backend::outbound::memory::InMemorySequenceStore;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), lms_backend::domain::sequencing::SequenceError> {
/// let sequencer = Sequencer::new(Arc::new(InMemorySequenceStore::default()));
/// let scope = ScopeKey::new(SequenceList::LatestTutorials, None)?;
/// let item = sequencer.append(scope, Uuid::new_v4()).await?;
/// assert_eq!(item.sequence.get(), 1);
/// # Ok(())
/// # }
/// ```
pub struct Sequencer<S> {
    store: Arc<S>,
}

impl<S> Sequencer<S> {
    /// Create a sequencer over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S> Clone for Sequencer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: SequenceStore> Sequencer<S> {
    /// Append `item_id` at the end of `scope`.
    ///
    /// Fails with `InvalidRequest` when the item is already sequenced in any
    /// scope of the same list.
    pub async fn append(
        &self,
        scope: ScopeKey,
        item_id: Uuid,
    ) -> Result<SequencedItem, SequenceError> {
        debug!(%scope, %item_id, "appending item");
        let outcome: Result<SequencedItem, SequenceError> = self
            .store
            .with_transaction(move |tx| Box::pin(append_tx(tx, scope, item_id)))
            .await;
        report("append", &scope, outcome)
    }

    /// Move `item` to `requested` within its scope, clamped to `1..=N`.
    pub async fn move_within_scope(
        &self,
        item: ItemRef,
        requested: i64,
    ) -> Result<SequencedItem, SequenceError> {
        debug!(%item, requested, "moving item within scope");
        let outcome: Result<SequencedItem, SequenceError> = self
            .store
            .with_transaction(move |tx| Box::pin(move_within_tx(tx, item, requested)))
            .await;
        report("move_within_scope", &item, outcome)
    }

    /// Move `item` into `target`, at `requested` or at the end.
    ///
    /// A target equal to the current scope degrades to a within-scope move:
    /// `requested` is clamped to `1..=N` there, so a position below 1 lands
    /// first, and `None` lands last. Across scopes, any `requested` outside
    /// `1..=N` of the target appends instead.
    pub async fn move_across_scopes(
        &self,
        item: ItemRef,
        target: ScopeKey,
        requested: Option<i64>,
    ) -> Result<SequencedItem, SequenceError> {
        if target.list() != item.list {
            return Err(SequenceError::invalid_request(format!(
                "cannot move {item} into a {} scope",
                target.list()
            )));
        }
        if matches!(item.list.shape(), ScopeShape::Global) {
            return Err(SequenceError::invalid_request(format!(
                "{} is a global list with a single scope",
                item.list
            )));
        }
        debug!(%item, %target, ?requested, "moving item across scopes");
        let outcome: Result<SequencedItem, SequenceError> = self
            .store
            .with_transaction(move |tx| Box::pin(transfer_tx(tx, item, target, requested)))
            .await;
        report("move_across_scopes", &item, outcome)
    }

    /// Hide `item`; already hidden items are returned unchanged.
    pub async fn deactivate(&self, item: ItemRef) -> Result<SequencedItem, SequenceError> {
        debug!(%item, "deactivating item");
        let outcome: Result<SequencedItem, SequenceError> = self
            .store
            .with_transaction(move |tx| Box::pin(deactivate_tx(tx, item)))
            .await;
        report("deactivate", &item, outcome)
    }

    /// Show a hidden `item` at the end of its scope; active items are
    /// returned unchanged.
    pub async fn reactivate(&self, item: ItemRef) -> Result<SequencedItem, SequenceError> {
        debug!(%item, "reactivating item");
        let outcome: Result<SequencedItem, SequenceError> = self
            .store
            .with_transaction(move |tx| Box::pin(reactivate_tx(tx, item)))
            .await;
        report("reactivate", &item, outcome)
    }

    /// Delete `item` and close the gap it leaves.
    pub async fn remove(&self, item: ItemRef) -> Result<(), SequenceError> {
        debug!(%item, "removing item");
        let outcome: Result<(), SequenceError> = self
            .store
            .with_transaction(move |tx| Box::pin(remove_tx(tx, item)))
            .await;
        report("remove", &item, outcome)
    }

    /// Positioned items of `scope` in sequence order.
    pub async fn list_scope(&self, scope: ScopeKey) -> Result<Vec<SequencedItem>, SequenceError> {
        let mut items = self.store.find_active_by_scope(&scope).await?;
        items.sort_by_key(|item| item.sequence);
        Ok(items)
    }

    /// One item's record, including hidden items.
    pub async fn find_item(&self, item: ItemRef) -> Result<SequencedItem, SequenceError> {
        self.store
            .find_item(&item)
            .await?
            .ok_or_else(|| SequenceError::not_found(item.to_string()))
    }
}

fn report<T>(
    operation: &'static str,
    subject: &dyn fmt::Display,
    outcome: Result<T, SequenceError>,
) -> Result<T, SequenceError> {
    match &outcome {
        Ok(_) => info!(operation, %subject, "sequencing operation committed"),
        Err(error @ (SequenceError::Conflict { .. } | SequenceError::StorageFailure { .. })) => {
            warn!(operation, %subject, %error, "sequencing operation rolled back");
        }
        Err(error) => debug!(operation, %subject, %error, "sequencing request rejected"),
    }
    outcome
}

async fn load<X>(tx: &mut X, item: &ItemRef) -> Result<SequencedItem, SequenceError>
where
    X: SequenceTransaction + ?Sized,
{
    tx.find_item(item)
        .await?
        .ok_or_else(|| SequenceError::not_found(item.to_string()))
}

async fn peek<X>(tx: &mut X, item: &ItemRef) -> Result<SequencedItem, SequenceError>
where
    X: SequenceTransaction + ?Sized,
{
    tx.peek_item(item)
        .await?
        .ok_or_else(|| SequenceError::not_found(item.to_string()))
}

/// Lock the scope `item` lives in, then the item itself.
///
/// The first read takes no row lock, so every transaction acquires its scope
/// locks before any row lock.
async fn lock_item<X>(tx: &mut X, item: &ItemRef) -> Result<SequencedItem, SequenceError>
where
    X: SequenceTransaction + ?Sized,
{
    let seen = peek(tx, item).await?;
    tx.lock_scope(&seen.scope).await?;
    let locked = load(tx, item).await?;
    if locked.scope != seen.scope {
        return Err(SequenceError::conflict(format!(
            "{item} changed scope while waiting for its lock"
        )));
    }
    Ok(locked)
}

async fn execute<X>(tx: &mut X, plan: &SequencePlan) -> Result<(), SequenceError>
where
    X: SequenceTransaction + ?Sized,
{
    for write in plan.writes() {
        let touched = tx.apply(write).await?;
        let single_row = !matches!(write, SequenceWrite::Shift(_));
        if single_row && touched != 1 {
            return Err(SequenceError::conflict(format!(
                "expected one row for {write:?}, touched {touched}"
            )));
        }
    }
    Ok(())
}

async fn append_tx<X>(
    tx: &mut X,
    scope: ScopeKey,
    item_id: Uuid,
) -> Result<SequencedItem, SequenceError>
where
    X: SequenceTransaction + ?Sized,
{
    tx.lock_scope(&scope).await?;
    let item = ItemRef::new(scope.list(), item_id);
    if let Some(existing) = tx.peek_item(&item).await? {
        return Err(SequenceError::invalid_request(format!(
            "{item} is already sequenced in {}",
            existing.scope
        )));
    }
    let scope_items = tx.find_active_by_scope(&scope).await?;
    execute(tx, &plan_append(scope, item_id, &scope_items)).await?;
    load(tx, &item).await
}

async fn move_within_tx<X>(
    tx: &mut X,
    item: ItemRef,
    requested: i64,
) -> Result<SequencedItem, SequenceError>
where
    X: SequenceTransaction + ?Sized,
{
    let current = lock_item(tx, &item).await?;
    if !current.active {
        return Err(SequenceError::invalid_request(format!(
            "{item} is inactive; reactivate it before moving"
        )));
    }
    let scope_items = tx.find_active_by_scope(&current.scope).await?;
    execute(tx, &plan_move_within(&current, &scope_items, requested)).await?;
    load(tx, &item).await
}

async fn transfer_tx<X>(
    tx: &mut X,
    item: ItemRef,
    target: ScopeKey,
    requested: Option<i64>,
) -> Result<SequencedItem, SequenceError>
where
    X: SequenceTransaction + ?Sized,
{
    let seen = peek(tx, &item).await?;
    if seen.scope == target {
        return move_within_tx(tx, item, requested.unwrap_or(i64::MAX)).await;
    }

    let mut scopes = [seen.scope, target];
    scopes.sort();
    for scope in &scopes {
        tx.lock_scope(scope).await?;
    }

    let current = load(tx, &item).await?;
    if current.scope != seen.scope {
        return Err(SequenceError::conflict(format!(
            "{item} changed scope while waiting for its lock"
        )));
    }
    if !current.active {
        return Err(SequenceError::invalid_request(format!(
            "{item} is inactive; reactivate it before moving"
        )));
    }
    let target_items = tx.find_active_by_scope(&target).await?;
    execute(tx, &plan_move_across(&current, target, &target_items, requested)).await?;
    load(tx, &item).await
}

async fn deactivate_tx<X>(tx: &mut X, item: ItemRef) -> Result<SequencedItem, SequenceError>
where
    X: SequenceTransaction + ?Sized,
{
    let current = lock_item(tx, &item).await?;
    execute(tx, &plan_deactivate(&current)).await?;
    load(tx, &item).await
}

async fn reactivate_tx<X>(tx: &mut X, item: ItemRef) -> Result<SequencedItem, SequenceError>
where
    X: SequenceTransaction + ?Sized,
{
    let current = lock_item(tx, &item).await?;
    let scope_items = tx.find_active_by_scope(&current.scope).await?;
    execute(tx, &plan_reactivate(&current, &scope_items)).await?;
    load(tx, &item).await
}

async fn remove_tx<X>(tx: &mut X, item: ItemRef) -> Result<(), SequenceError>
where
    X: SequenceTransaction + ?Sized,
{
    let current = lock_item(tx, &item).await?;
    execute(tx, &plan_remove(&current)).await
}

#[async_trait]
impl<S: SequenceStore> SequencingCommand for Sequencer<S> {
    async fn append(&self, request: AppendItemRequest) -> Result<SequencedItem, Error> {
        Sequencer::append(self, request.scope, request.item_id)
            .await
            .map_err(Error::from)
    }

    async fn move_within_scope(&self, request: MoveItemRequest) -> Result<SequencedItem, Error> {
        Sequencer::move_within_scope(self, request.item, request.sequence)
            .await
            .map_err(Error::from)
    }

    async fn move_across_scopes(
        &self,
        request: TransferItemRequest,
    ) -> Result<SequencedItem, Error> {
        Sequencer::move_across_scopes(self, request.item, request.target, request.sequence)
            .await
            .map_err(Error::from)
    }

    async fn deactivate(&self, item: ItemRef) -> Result<SequencedItem, Error> {
        Sequencer::deactivate(self, item).await.map_err(Error::from)
    }

    async fn reactivate(&self, item: ItemRef) -> Result<SequencedItem, Error> {
        Sequencer::reactivate(self, item).await.map_err(Error::from)
    }

    async fn remove(&self, item: ItemRef) -> Result<(), Error> {
        Sequencer::remove(self, item).await.map_err(Error::from)
    }
}

#[async_trait]
impl<S: SequenceStore> SequencingQuery for Sequencer<S> {
    async fn list_scope(&self, scope: ScopeKey) -> Result<Vec<SequencedItem>, Error> {
        Sequencer::list_scope(self, scope).await.map_err(Error::from)
    }

    async fn find_item(&self, item: ItemRef) -> Result<SequencedItem, Error> {
        Sequencer::find_item(self, item).await.map_err(Error::from)
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
