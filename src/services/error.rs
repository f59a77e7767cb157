// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed failures raised by the domain services.
//!
//! Each variant maps to exactly one HTTP status in [`crate::error::ApiError`].

use std::collections::BTreeMap;

use thiserror::Error;

use crate::lifecycle::{LifecycleError, ScopeError};
use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or missing input fields, keyed by field name.
    #[error("validation failed: {0:?}")]
    Validation(BTreeMap<String, String>),

    /// Business rule violation.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Unexpected failure; carries only the error category.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => ServiceError::NotFound(msg),
            StoreError::Conflict(field) => ServiceError::Conflict(format!("{field} already in use")),
            other => {
                tracing::error!(error = %other, "store failure");
                ServiceError::Internal(other.category().to_string())
            }
        }
    }
}

impl From<LifecycleError> for ServiceError {
    fn from(err: LifecycleError) -> Self {
        ServiceError::BadRequest(err.to_string())
    }
}

impl From<ScopeError> for ServiceError {
    fn from(err: ScopeError) -> Self {
        ServiceError::Forbidden(err.to_string())
    }
}
