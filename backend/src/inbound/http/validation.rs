//! Shared validation helpers for inbound HTTP adapters.
//!
//! Failures carry `details.field` and `details.code` so clients can point at
//! the offending input.

use std::str::FromStr;

use serde_json::json;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::sequencing::{ScopeKey, SequenceList};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidUuid,
    UnknownList,
    InvalidScope,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::UnknownList => "unknown_list",
            ErrorCode::InvalidScope => "invalid_scope",
        }
    }
}

/// Newtype wrapper for HTTP field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

fn field_error(field: FieldName, code: ErrorCode, message: String, value: Option<&str>) -> Error {
    let mut details = json!({
        "field": field.as_str(),
        "code": code.as_str(),
    });
    if let (Some(value), Some(map)) = (value, details.as_object_mut()) {
        map.insert("value".to_owned(), json!(value));
    }
    Error::invalid_request(message).with_details(details)
}

pub(crate) fn parse_uuid(value: &str, field: FieldName) -> Result<Uuid, Error> {
    Uuid::parse_str(value).map_err(|_| {
        field_error(
            field,
            ErrorCode::InvalidUuid,
            format!("{} must be a valid UUID", field.as_str()),
            Some(value),
        )
    })
}

pub(crate) fn parse_optional_uuid(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<Uuid>, Error> {
    value.map(|raw| parse_uuid(raw, field)).transpose()
}

pub(crate) fn parse_list(value: &str) -> Result<SequenceList, Error> {
    SequenceList::from_str(value).map_err(|err| {
        field_error(
            FieldName::new("list"),
            ErrorCode::UnknownList,
            err.to_string(),
            Some(value),
        )
    })
}

/// Build the scope for `list`, reporting a parent mismatch against `field`.
pub(crate) fn scope_for(
    list: SequenceList,
    parent: Option<Uuid>,
    field: FieldName,
) -> Result<ScopeKey, Error> {
    ScopeKey::new(list, parent)
        .map_err(|err| field_error(field, ErrorCode::InvalidScope, err.to_string(), None))
}
