//! Diesel and pool error mapping for the sequence store.
//!
//! Lock timeouts, deadlocks and serialization failures are reported as
//! conflicts so callers can retry. A primary-key violation means another
//! transaction sequenced the same item first, which is also a conflict. Other
//! constraint violations are kept apart from generic query failures because
//! they indicate a plan that broke the ordering invariants.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::SequenceStoreError;

use super::pool::PoolError;

/// Map a pool checkout or build failure into a connection error.
pub(crate) fn map_pool_error(error: PoolError) -> SequenceStoreError {
    SequenceStoreError::connection(error.message())
}

fn is_conflict_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("deadlock detected")
        || lower.contains("lock timeout")
        || lower.contains("could not obtain lock")
        || lower.contains("could not serialize access")
}

/// Primary key of `sequence_entries`: one record per item and list.
const ITEM_KEY_CONSTRAINT: &str = "sequence_entries_pkey";

fn is_constraint_message(message: &str) -> bool {
    message.to_lowercase().contains("violates exclusion constraint")
}

/// Map a Diesel error raised while running `operation`.
pub(crate) fn map_diesel_error(error: DieselError, operation: &str) -> SequenceStoreError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), %operation, "diesel operation failed");
        }
        _ => debug!(%error, %operation, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(kind, info) => match kind {
            DatabaseErrorKind::SerializationFailure => {
                SequenceStoreError::conflict(info.message())
            }
            DatabaseErrorKind::ClosedConnection | DatabaseErrorKind::UnableToSendCommand => {
                SequenceStoreError::connection(info.message())
            }
            DatabaseErrorKind::UniqueViolation
                if info.constraint_name() == Some(ITEM_KEY_CONSTRAINT) =>
            {
                SequenceStoreError::conflict(info.message())
            }
            DatabaseErrorKind::UniqueViolation
            | DatabaseErrorKind::CheckViolation
            | DatabaseErrorKind::NotNullViolation
            | DatabaseErrorKind::ForeignKeyViolation => {
                SequenceStoreError::constraint(info.message())
            }
            _ if is_conflict_message(info.message()) => {
                SequenceStoreError::conflict(info.message())
            }
            _ if is_constraint_message(info.message()) => {
                SequenceStoreError::constraint(info.message())
            }
            _ => SequenceStoreError::query(format!("{operation}: {}", info.message())),
        },
        DieselError::BrokenTransactionManager => {
            SequenceStoreError::connection("transaction manager is broken")
        }
        other => SequenceStoreError::query(format!("{operation}: {other}")),
    }
}
