//! HTTP inbound adapter exposing REST endpoints.

use actix_web::{HttpRequest, web};

pub mod error;
pub mod health;
pub mod schemas;
pub mod sequences;
pub mod state;
pub mod validation;

pub use error::ApiResult;

use crate::domain::Error;

fn malformed(what: &str, err: impl std::fmt::Display) -> actix_web::Error {
    Error::invalid_request(format!("malformed {what}: {err}")).into()
}

/// Extractor settings that report malformed input as domain error envelopes.
pub fn configure_extractors(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req: &HttpRequest| malformed("JSON body", err)),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req: &HttpRequest| malformed("query string", err)),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req: &HttpRequest| malformed("path", err)),
    );
}
