// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login and key publication.

use axum::{extract::State, http::StatusCode, Json};
use jsonwebtoken::jwk::JwkSet;

use crate::error::ApiError;
use crate::models::{LoginRequest, LoginResponse};
use crate::services;
use crate::state::AuthState;

/// Exchange credentials for a signed access token.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Malformed credentials"),
        (status = 401, description = "Invalid credentials or inactive account"),
    )
)]
pub async fn login(
    State(state): State<AuthState>,
    Json(request): Json<LoginRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), ApiError> {
    let response = services::auth::login(&state.store, &state.issuer, &request)?;
    Ok((StatusCode::OK, Json(response)))
}

/// Public signing key in JWK Set form.
#[utoipa::path(
    get,
    path = "/.well-known/jwks.json",
    tag = "Auth",
    responses(
        (status = 200, description = "Verification keys as an RFC 7517 JWK Set"),
    )
)]
pub async fn jwks(State(state): State<AuthState>) -> Json<JwkSet> {
    Json(state.jwks.as_ref().clone())
}
