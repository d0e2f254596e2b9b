//! Error types surfaced by registry services.
use thiserror::Error;

use crate::authz::Operation;
use crate::model::EntityKind;
use crate::store::StoreError;

/// A rejected precondition. Raised before any side effect or store mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: EntityKind, key: String },
    #[error("{kind} {key} not found")]
    NotFound { kind: EntityKind, key: String },
    #[error("{kind} is missing required field `{field}`")]
    MissingField { kind: EntityKind, field: &'static str },
    #[error("{kind} field `{field}` is invalid: {reason}")]
    InvalidField {
        kind: EntityKind,
        field: &'static str,
        reason: String,
    },
    #[error("{kind} {key} references missing {reference_kind} {reference}")]
    DanglingReference {
        kind: EntityKind,
        key: String,
        reference_kind: EntityKind,
        reference: String,
    },
    #[error("{kind} {key}: field `{field}` cannot change")]
    Immutable {
        kind: EntityKind,
        key: String,
        field: &'static str,
    },
    #[error("invalid key query `{field}`: {reason}")]
    InvalidQuery { field: &'static str, reason: String },
    #[error("no {kind} handler registered for type `{handler_type}`")]
    UnknownHandler {
        kind: EntityKind,
        handler_type: String,
    },
}

/// Failure reported by a handler. Aborts the operation before persistence.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("handler rejected {key}: {reason}")]
    Rejected { key: String, reason: String },
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn rejected(key: impl ToString, reason: impl Into<String>) -> Self {
        Self::Rejected {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("{kind} {key} is in use by {dependent_kind} {dependent_key}")]
    InUse {
        kind: EntityKind,
        key: String,
        dependent_kind: EntityKind,
        dependent_key: String,
    },
    #[error("handler failed: {0}")]
    Handler(#[from] HandlerError),
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
    #[error("{operation} on {kind} {key} is forbidden")]
    Forbidden {
        operation: Operation,
        kind: EntityKind,
        key: String,
    },
}

pub type RegistryResult<T> = Result<T, RegistryError>;
