//! Driving port for ordering reads.

use async_trait::async_trait;

use crate::domain::Error;
use crate::domain::sequencing::{ItemRef, ScopeKey, SequencedItem};

/// Driving port for ordering read operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SequencingQuery: Send + Sync {
    /// Positioned items of a scope in sequence order.
    async fn list_scope(&self, scope: ScopeKey) -> Result<Vec<SequencedItem>, Error>;

    /// One item's ordering record, including hidden items.
    async fn find_item(&self, item: ItemRef) -> Result<SequencedItem, Error>;
}
