// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication gate.
//!
//! Runs on every request. A valid `Authorization: Bearer <token>` header
//! results in an [`AuthenticatedUser`] in the request extensions; anything
//! else leaves the request anonymous. The gate never rejects: the extractors
//! in `extractor.rs` decide per route whether anonymous means 401.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/protected", get(protected_handler))
//!     .layer(axum::middleware::from_fn_with_state(verifier, authenticate));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::claims::AuthenticatedUser;
use super::verifier::TokenVerifier;

/// Extract the bearer token from the request headers.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authentication middleware function.
pub async fn authenticate(
    State(verifier): State<Arc<TokenVerifier>>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(request.headers()) {
        match verifier.verify(token).await {
            Some(claims) => {
                let user = AuthenticatedUser::from_claims(claims);
                tracing::trace!(
                    username = %user.username,
                    authorities = ?user.authorities(),
                    "request authenticated"
                );
                request.extensions_mut().insert(user);
            }
            None => tracing::debug!(path = %request.uri().path(), "bearer token rejected"),
        }
    }

    next.run(request).await
}
