//! Driven port for transactional storage of ordering records.
//!
//! The sequencer never issues a write outside
//! [`SequenceStore::with_transaction`]. Adapters commit when the unit of work
//! returns `Ok` and roll back on `Err`, and they must reject any statement
//! that leaves two positioned items of one scope at the same sequence.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::domain::sequencing::{
    ItemRef, ScopeKey, SequenceError, SequenceWrite, SequencedItem,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by sequence store adapters.
    pub enum SequenceStoreError {
        /// The store could not be reached or the pool was exhausted.
        Connection { message: String } =>
            "sequence store connection failed: {message}",
        /// A query or mutation failed during execution.
        Query { message: String } =>
            "sequence store query failed: {message}",
        /// The transaction lost a race: lock timeout, deadlock or
        /// serialization failure.
        Conflict { message: String } =>
            "sequence store transaction conflict: {message}",
        /// A statement violated a uniqueness or range constraint.
        Constraint { message: String } =>
            "sequence store constraint violated: {message}",
    }
}

/// Boxed unit of work borrowing an open transaction.
pub type TransactionFuture<'t, T> =
    Pin<Box<dyn Future<Output = Result<T, SequenceError>> + Send + 't>>;

/// Statements available inside an open transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SequenceTransaction: Send {
    /// Serialize with every other transaction that locks `scope`.
    ///
    /// The lock is held until the transaction ends.
    async fn lock_scope(&mut self, scope: &ScopeKey) -> Result<(), SequenceStoreError>;

    /// Read one ordering record without locking it.
    ///
    /// Used before the item's scope is known; taking a row lock here would
    /// order row locks ahead of scope locks.
    async fn peek_item(
        &mut self,
        item: &ItemRef,
    ) -> Result<Option<SequencedItem>, SequenceStoreError>;

    /// Read one ordering record, active or not, locking it until the
    /// transaction ends.
    ///
    /// Callers hold the item's scope lock first.
    async fn find_item(
        &mut self,
        item: &ItemRef,
    ) -> Result<Option<SequencedItem>, SequenceStoreError>;

    /// Read the positioned items of a scope in sequence order.
    async fn find_active_by_scope(
        &mut self,
        scope: &ScopeKey,
    ) -> Result<Vec<SequencedItem>, SequenceStoreError>;

    /// Execute one write, returning the number of rows it touched.
    async fn apply(&mut self, write: &SequenceWrite) -> Result<u64, SequenceStoreError>;
}

/// Port for reading and transactionally rewriting ordering records.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Run `work` inside one transaction.
    ///
    /// Commits when `work` returns `Ok`; otherwise every write it made is
    /// discarded and the error is returned unchanged.
    async fn with_transaction<T, F>(&self, work: F) -> Result<T, SequenceError>
    where
        T: Send + 'static,
        F: for<'t> FnOnce(&'t mut dyn SequenceTransaction) -> TransactionFuture<'t, T>
            + Send
            + 'static;

    /// Read the positioned items of a scope in sequence order.
    async fn find_active_by_scope(
        &self,
        scope: &ScopeKey,
    ) -> Result<Vec<SequencedItem>, SequenceStoreError>;

    /// Read one ordering record, active or not.
    async fn find_item(&self, item: &ItemRef) -> Result<Option<SequencedItem>, SequenceStoreError>;
}
