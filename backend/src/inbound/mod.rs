//! Inbound adapters that translate external requests into sequencing calls
//! while keeping framework details at the edge.

pub mod http;
