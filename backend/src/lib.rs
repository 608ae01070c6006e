//! Learning-management backend library.
//!
//! Keeps course modules, submodules, videos and dashboard lists in dense,
//! gapless order under concurrent edits. The domain layer plans each
//! reordering; inbound adapters expose it over HTTP and outbound adapters
//! persist it in PostgreSQL or process memory.

pub mod config;
pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
