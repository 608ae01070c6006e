//! Shared helpers for sequencing integration tests.
//!
//! The ordering helpers are generic over the store so the same scenarios run
//! against the in-memory adapter and against embedded PostgreSQL.

#![allow(
    dead_code,
    reason = "each integration test binary uses a different subset of helpers"
)]

pub mod embedded_postgres;

use std::sync::Arc;

use lms_backend::domain::ports::SequenceStore;
use lms_backend::domain::sequencing::{
    ItemRef, ScopeKey, SequenceList, Sequencer, SequencedItem, plan,
};
use lms_backend::outbound::memory::InMemorySequenceStore;
use uuid::Uuid;

/// A sequencer over a fresh in-memory store, plus a handle on that store.
pub fn memory_sequencer() -> (Sequencer<InMemorySequenceStore>, InMemorySequenceStore) {
    let store = InMemorySequenceStore::default();
    (Sequencer::new(Arc::new(store.clone())), store)
}

/// A scope of `list` under a fresh parent.
pub fn fresh_scope(list: SequenceList) -> ScopeKey {
    ScopeKey::new(list, Some(Uuid::new_v4())).expect("parented list accepts a parent")
}

/// Append `count` fresh items to `scope`, returning their ids in order.
pub async fn seed<S: SequenceStore>(
    sequencer: &Sequencer<S>,
    scope: ScopeKey,
    count: usize,
) -> Vec<Uuid> {
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let id = Uuid::new_v4();
        sequencer.append(scope, id).await.expect("append succeeds");
        ids.push(id);
    }
    ids
}

/// Item ids of `scope` in sequence order.
pub async fn order<S: SequenceStore>(sequencer: &Sequencer<S>, scope: ScopeKey) -> Vec<Uuid> {
    listed(sequencer, scope).await.iter().map(|item| item.id).collect()
}

/// Positioned items of `scope`, asserting the listing is dense.
pub async fn listed<S: SequenceStore>(
    sequencer: &Sequencer<S>,
    scope: ScopeKey,
) -> Vec<SequencedItem> {
    let items = sequencer.list_scope(scope).await.expect("listing succeeds");
    assert!(plan::is_dense(&items), "scope {scope} is not dense: {items:?}");
    items
}

/// Reference to `id` in `list`.
pub fn item(list: SequenceList, id: Uuid) -> ItemRef {
    ItemRef::new(list, id)
}
