//! PostgreSQL persistence for sequencing using Diesel ORM.
//!
//! The store implements the domain's sequence store port over `diesel-async`
//! connections drawn from a `bb8` pool.
//!
//! - **Thin adapter**: the store executes the writes the domain plans and
//!   reports row counts. No ordering logic resides here.
//! - **Internal models**: row structs (`models.rs`) and the table definition
//!   (`schema.rs`) never leave this module.
//! - **Strongly typed errors**: database failures map onto
//!   [`SequenceStoreError`](crate::domain::ports::SequenceStoreError), with
//!   lock timeouts and deadlocks surfacing as conflicts.
//!
//! # Example
//!
//! ```ignore
//! use lms_backend::outbound::persistence::{DbPool, DieselSequenceStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/lms")).await?;
//! let store = DieselSequenceStore::new(pool);
//! ```

mod diesel_error_mapping;
mod diesel_sequence_store;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_sequence_store::DieselSequenceStore;
pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
