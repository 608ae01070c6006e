//! PostgreSQL-backed sequence store.
//!
//! Each unit of work runs in one Diesel transaction on a pooled connection.
//! Scope locks are transaction-scoped advisory locks keyed by a digest of the
//! scope identity, and the transaction's `lock_timeout` bounds how long a
//! writer waits for one. Uniqueness of positions is enforced by the
//! `sequence_entries_unique_position` exclusion constraint, which Postgres
//! checks at the end of every statement.

use std::time::Duration;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::domain::ports::{
    SequenceStore, SequenceStoreError, SequenceTransaction, TransactionFuture,
};
use crate::domain::sequencing::{
    ItemRef, ScopeKey, SequenceError, SequenceWrite, SequencedItem,
};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{NewSequenceEntryRow, SequenceEntryRow, scope_column};
use super::pool::DbPool;
use super::schema::sequence_entries;

/// Diesel-backed implementation of the sequence store port.
#[derive(Clone)]
pub struct DieselSequenceStore {
    pool: DbPool,
    lock_timeout: Duration,
}

impl DieselSequenceStore {
    /// Create a store over `pool` with a 5 second lock timeout.
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            lock_timeout: Duration::from_secs(5),
        }
    }

    /// Bound how long a transaction waits for a scope lock or row lock.
    #[must_use]
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

/// Advisory lock key for `scope`.
///
/// The first eight bytes of a SHA-256 digest of the scope's display form,
/// read big-endian. Distinct scopes colliding only costs extra serialization.
pub(crate) fn scope_lock_key(scope: &ScopeKey) -> i64 {
    let digest = Sha256::digest(scope.to_string().as_bytes());
    let prefix = digest
        .iter()
        .take(8)
        .fold(0_u64, |acc, byte| (acc << 8) | u64::from(*byte));
    i64::from_be_bytes(prefix.to_be_bytes())
}

fn count(rows: usize) -> u64 {
    u64::try_from(rows).unwrap_or(u64::MAX)
}

fn to_domain(row: SequenceEntryRow) -> Result<SequencedItem, SequenceStoreError> {
    let key = format!("{} item {}", row.list_kind, row.item_id);
    SequencedItem::try_from(row)
        .map_err(|reason| SequenceStoreError::query(format!("corrupt row for {key}: {reason}")))
}

async fn load_item(
    conn: &mut AsyncPgConnection,
    item: &ItemRef,
    for_update: bool,
) -> Result<Option<SequencedItem>, SequenceStoreError> {
    let query = sequence_entries::table
        .filter(sequence_entries::list_kind.eq(item.list.as_str()))
        .filter(sequence_entries::item_id.eq(item.id))
        .select(SequenceEntryRow::as_select());
    let row = if for_update {
        query.for_update().first(conn).await.optional()
    } else {
        query.first(conn).await.optional()
    }
    .map_err(|err| map_diesel_error(err, "find sequence entry"))?;
    row.map(to_domain).transpose()
}

async fn load_scope(
    conn: &mut AsyncPgConnection,
    scope: &ScopeKey,
) -> Result<Vec<SequencedItem>, SequenceStoreError> {
    let rows: Vec<SequenceEntryRow> = sequence_entries::table
        .filter(sequence_entries::list_kind.eq(scope.list().as_str()))
        .filter(sequence_entries::scope_id.eq(scope_column(scope)))
        .filter(sequence_entries::active.eq(true))
        .filter(sequence_entries::sequence.gt(0))
        .order_by(sequence_entries::sequence.asc())
        .select(SequenceEntryRow::as_select())
        .load(conn)
        .await
        .map_err(|err| map_diesel_error(err, "list scope entries"))?;
    rows.into_iter().map(to_domain).collect()
}

/// Open transaction handed to units of work.
struct PgSequenceTransaction<'c> {
    conn: &'c mut AsyncPgConnection,
}

#[async_trait]
impl SequenceTransaction for PgSequenceTransaction<'_> {
    async fn lock_scope(&mut self, scope: &ScopeKey) -> Result<(), SequenceStoreError> {
        let key = scope_lock_key(scope);
        debug!(%scope, key, "acquiring scope lock");
        sql_query("SELECT pg_advisory_xact_lock($1)")
            .bind::<BigInt, _>(key)
            .execute(self.conn)
            .await
            .map_err(|err| map_diesel_error(err, "lock scope"))?;
        Ok(())
    }

    async fn peek_item(
        &mut self,
        item: &ItemRef,
    ) -> Result<Option<SequencedItem>, SequenceStoreError> {
        load_item(self.conn, item, false).await
    }

    async fn find_item(
        &mut self,
        item: &ItemRef,
    ) -> Result<Option<SequencedItem>, SequenceStoreError> {
        load_item(self.conn, item, true).await
    }

    async fn find_active_by_scope(
        &mut self,
        scope: &ScopeKey,
    ) -> Result<Vec<SequencedItem>, SequenceStoreError> {
        load_scope(self.conn, scope).await
    }

    async fn apply(&mut self, write: &SequenceWrite) -> Result<u64, SequenceStoreError> {
        let conn = &mut *self.conn;
        let touched = match write {
            SequenceWrite::Insert(item) => diesel::insert_into(sequence_entries::table)
                .values(NewSequenceEntryRow::from(item))
                .execute(conn)
                .await
                .map_err(|err| map_diesel_error(err, "insert sequence entry"))?,
            SequenceWrite::Assign {
                item,
                scope,
                sequence,
                active,
            } => diesel::update(
                sequence_entries::table
                    .filter(sequence_entries::list_kind.eq(item.list.as_str()))
                    .filter(sequence_entries::item_id.eq(item.id)),
            )
            .set((
                sequence_entries::scope_id.eq(scope_column(scope)),
                sequence_entries::sequence.eq(sequence.get()),
                sequence_entries::active.eq(*active),
                sequence_entries::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await
            .map_err(|err| map_diesel_error(err, "assign sequence entry"))?,
            SequenceWrite::Shift(shift) => {
                let excluded: Vec<uuid::Uuid> = shift.exclude.into_iter().collect();
                diesel::update(
                    sequence_entries::table
                        .filter(sequence_entries::list_kind.eq(shift.scope.list().as_str()))
                        .filter(sequence_entries::scope_id.eq(scope_column(&shift.scope)))
                        .filter(sequence_entries::active.eq(true))
                        .filter(sequence_entries::sequence.ge(shift.from.max(1)))
                        .filter(sequence_entries::sequence.le(shift.to.unwrap_or(i32::MAX)))
                        .filter(sequence_entries::item_id.ne_all(excluded)),
                )
                .set((
                    sequence_entries::sequence.eq(sequence_entries::sequence + shift.delta),
                    sequence_entries::updated_at.eq(diesel::dsl::now),
                ))
                .execute(conn)
                .await
                .map_err(|err| map_diesel_error(err, "shift sequence range"))?
            }
            SequenceWrite::Delete(item) => diesel::delete(
                sequence_entries::table
                    .filter(sequence_entries::list_kind.eq(item.list.as_str()))
                    .filter(sequence_entries::item_id.eq(item.id)),
            )
            .execute(conn)
            .await
            .map_err(|err| map_diesel_error(err, "delete sequence entry"))?,
        };
        Ok(count(touched))
    }
}

/// Failure inside a Diesel transaction closure.
///
/// Diesel needs `From<diesel::result::Error>` on the closure's error type;
/// this keeps driver errors apart from the unit of work's own errors.
enum TxError {
    Diesel(diesel::result::Error),
    Work(SequenceError),
}

impl From<diesel::result::Error> for TxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

#[async_trait]
impl SequenceStore for DieselSequenceStore {
    async fn with_transaction<T, F>(&self, work: F) -> Result<T, SequenceError>
    where
        T: Send + 'static,
        F: for<'t> FnOnce(&'t mut dyn SequenceTransaction) -> TransactionFuture<'t, T>
            + Send
            + 'static,
    {
        let mut pooled = self
            .pool
            .get()
            .await
            .map_err(map_pool_error)
            .map_err(SequenceError::from)?;
        let conn: &mut AsyncPgConnection = &mut pooled;
        let lock_timeout = format!("{}ms", self.lock_timeout.as_millis());

        let outcome = conn
            .transaction::<T, TxError, _>(|conn| {
                async move {
                    sql_query("SELECT set_config('lock_timeout', $1, true)")
                        .bind::<Text, _>(lock_timeout)
                        .execute(conn)
                        .await?;
                    let mut tx = PgSequenceTransaction { conn };
                    work(&mut tx).await.map_err(TxError::Work)
                }
                .scope_boxed()
            })
            .await;

        match outcome {
            Ok(value) => Ok(value),
            Err(TxError::Work(error)) => {
                debug!(%error, "rolled back sequencing transaction");
                Err(error)
            }
            Err(TxError::Diesel(error)) => {
                Err(map_diesel_error(error, "sequencing transaction").into())
            }
        }
    }

    async fn find_active_by_scope(
        &self,
        scope: &ScopeKey,
    ) -> Result<Vec<SequencedItem>, SequenceStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        load_scope(&mut conn, scope).await
    }

    async fn find_item(&self, item: &ItemRef) -> Result<Option<SequencedItem>, SequenceStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        load_item(&mut conn, item, false).await
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use uuid::Uuid;

    use super::*;
    use crate::domain::sequencing::SequenceList;

    #[rstest]
    fn lock_keys_are_stable_per_scope() {
        let parent = Uuid::new_v4();
        let scope = ScopeKey::new(SequenceList::CourseModules, Some(parent)).expect("scope");
        let same = ScopeKey::new(SequenceList::CourseModules, Some(parent)).expect("scope");
        assert_eq!(scope_lock_key(&scope), scope_lock_key(&same));
    }

    #[rstest]
    fn lock_keys_separate_lists_sharing_a_parent() {
        let parent = Uuid::new_v4();
        let modules = ScopeKey::new(SequenceList::CourseModules, Some(parent)).expect("scope");
        let recommended =
            ScopeKey::new(SequenceList::RecommendedVideos, Some(parent)).expect("scope");
        assert_ne!(scope_lock_key(&modules), scope_lock_key(&recommended));
    }

    #[rstest]
    fn global_lists_lock_on_their_own_key() {
        let carousel = ScopeKey::new(SequenceList::DashboardCarousel, None).expect("scope");
        let tutorials = ScopeKey::new(SequenceList::LatestTutorials, None).expect("scope");
        assert_ne!(scope_lock_key(&carousel), scope_lock_key(&tutorials));
    }
}
