// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP error boundary.
//!
//! Every failure leaves the services as
//! `{timestamp, status, error, message, path[, details]}`.
//! Handlers return [`ApiError`]; the [`error_envelope`] middleware fills in
//! `path` from the request URI and wraps framework rejections (bad JSON,
//! unknown routes) in the same shape.

use axum::{
    body::to_bytes,
    extract::Request,
    http::{header::CONTENT_TYPE, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::services::ServiceError;

/// Upper bound when re-reading a framework rejection body.
const REJECTION_BODY_LIMIT: usize = 16 * 1024;

#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    timestamp: String,
    status: u16,
    error: &'a str,
    message: &'a str,
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// 500 that only exposes the failure category.
    pub fn internal(category: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Unexpected error")
            .with_details(serde_json::json!({ "exception": category }))
    }

    /// Render the error for a request path.
    pub fn to_response(&self, path: &str) -> Response {
        let body = ErrorBody {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            status: self.status.as_u16(),
            error: self.status.canonical_reason().unwrap_or("Error"),
            message: &self.message,
            path,
            details: self.details.as_ref(),
        };
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // The envelope middleware re-renders with the request path.
        let mut response = self.to_response("");
        response.extensions_mut().insert(self);
        response
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(details) => {
                let details = serde_json::to_value(details).unwrap_or(Value::Null);
                ApiError::bad_request("Validation failed").with_details(details)
            }
            ServiceError::BadRequest(msg) => ApiError::bad_request(msg),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ServiceError::Unauthorized(msg) => ApiError::unauthorized(msg),
            ServiceError::Internal(category) => {
                tracing::error!(category = %category, "internal error");
                ApiError::internal(&category)
            }
        }
    }
}

/// Response middleware giving every error the structured envelope.
///
/// - `ApiError` responses are re-rendered with the request path
/// - other 4xx/5xx responses that are not JSON (axum rejections, unmatched
///   routes) are wrapped, keeping their text as the message
pub async fn error_envelope(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    if let Some(err) = response.extensions().get::<ApiError>() {
        return err.to_response(&path);
    }

    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if is_json {
        return response;
    }

    let bytes = to_bytes(response.into_body(), REJECTION_BODY_LIMIT)
        .await
        .unwrap_or_default();
    let text = String::from_utf8_lossy(&bytes).trim().to_string();
    let message = if text.is_empty() {
        status.canonical_reason().unwrap_or("Error").to_string()
    } else {
        text
    };

    ApiError::new(status, message).to_response(&path)
}
