// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// Rejections produced by the route guards.
///
/// Token problems are never surfaced in detail: the gate has already
/// collapsed them into "no principal".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// A bearer token was sent but did not verify
    InvalidToken,
    /// Authenticated, but none of the required roles
    InsufficientPermissions,
}

impl AuthError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Full authentication is required"),
            AuthError::InvalidToken => write!(f, "Invalid or expired token"),
            AuthError::InsufficientPermissions => write!(f, "Access denied"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::new(self.status_code(), self.to_string()).into_response()
    }
}
