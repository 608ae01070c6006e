//! Domain primitives, services and ports.
//!
//! Purpose: define the transport-agnostic ordering model shared by the HTTP
//! adapter and the persistence adapters. Types document their invariants in
//! Rustdoc; nothing here depends on Actix or Diesel.
//!
//! Public surface:
//! - Error (alias to `error::Error`): API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - TraceId (alias to `trace_id::TraceId`): request correlation identifier.
//! - sequencing: dense per-scope ordering and the `Sequencer` service.
//! - ports: driving and driven ports around the sequencer.

pub mod error;
pub mod ports;
pub mod sequencing;
pub mod trace_id;

pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::trace_id::TraceId;
