//! Outbound adapters implementing domain ports for storage.
//!
//! - **persistence**: PostgreSQL-backed sequence store using Diesel ORM
//! - **memory**: in-process sequence store for development and tests
//!
//! Adapters translate between domain types and storage representations and
//! contain no ordering logic.

pub mod memory;
pub mod persistence;
