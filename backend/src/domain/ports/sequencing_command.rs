//! Driving port for ordering mutations.
//!
//! Inbound adapters call this port to reorder, hide and remove items across
//! every sequenced list without knowing how positions are stored.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::sequencing::{ItemRef, ScopeKey, SequencedItem};

/// Request to append a new item at the end of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendItemRequest {
    pub scope: ScopeKey,
    pub item_id: Uuid,
}

/// Request to move an item within its current scope.
///
/// `sequence` is clamped to `1..=N`; values outside `i32` saturate first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveItemRequest {
    pub item: ItemRef,
    pub sequence: i64,
}

/// Request to move an item into another scope of the same list.
///
/// A missing or out-of-range `sequence` appends to the end of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferItemRequest {
    pub item: ItemRef,
    pub target: ScopeKey,
    pub sequence: Option<i64>,
}

/// Driving port for ordering write operations.
///
/// Every method runs in one transaction: on `Err` nothing was written.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SequencingCommand: Send + Sync {
    /// Append a new item at position `N + 1` of its scope.
    async fn append(&self, request: AppendItemRequest) -> Result<SequencedItem, Error>;

    /// Move an item to a new position in its scope.
    async fn move_within_scope(&self, request: MoveItemRequest) -> Result<SequencedItem, Error>;

    /// Move an item into another scope of the same list.
    ///
    /// Naming the item's own scope makes this a within-scope move.
    async fn move_across_scopes(
        &self,
        request: TransferItemRequest,
    ) -> Result<SequencedItem, Error>;

    /// Hide an item, closing the gap it leaves.
    async fn deactivate(&self, item: ItemRef) -> Result<SequencedItem, Error>;

    /// Show a hidden item again at the end of its scope.
    async fn reactivate(&self, item: ItemRef) -> Result<SequencedItem, Error>;

    /// Delete an item's ordering record, closing the gap it leaves.
    async fn remove(&self, item: ItemRef) -> Result<(), Error>;
}
