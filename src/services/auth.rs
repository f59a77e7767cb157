// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login: credential check and token issuance.

use crate::auth::password::{verify_against_dummy, verify_password};
use crate::auth::{Role, TokenIssuer, TokenSubject};
use crate::models::{LoginRequest, LoginResponse};
use crate::storage::{CredentialStore, RoleRepository, UserRepository};

use super::validation::Violations;
use super::{ServiceError, ServiceResult};

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const ACCOUNT_INACTIVE: &str = "Account inactive";

/// Authenticate `username`/`password` and issue an access token.
///
/// An unknown user and a wrong password fail with the same message. An
/// inactive account is reported as such.
pub fn login(
    store: &CredentialStore,
    issuer: &TokenIssuer,
    request: &LoginRequest,
) -> ServiceResult<LoginResponse> {
    let mut v = Violations::new();
    v.required("username", &request.username, 150);
    v.length("password", &request.password, 8, 120);
    v.finish()?;

    let Some(user) = UserRepository::new(store).find_by_username(&request.username)? else {
        verify_against_dummy(&request.password);
        tracing::warn!(username = %request.username, reason = "unknown_user", "login failed");
        return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !user.active {
        tracing::warn!(username = %user.username, reason = "inactive", "login failed");
        return Err(ServiceError::Unauthorized(ACCOUNT_INACTIVE.to_string()));
    }

    if !verify_password(&request.password, &user.password_hash) {
        tracing::warn!(username = %user.username, reason = "bad_password", "login failed");
        return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let roles: Vec<Role> = RoleRepository::new(store)
        .resolve(&user.role_ids)?
        .into_iter()
        .map(|r| r.name)
        .collect();

    let issued = issuer
        .issue(&TokenSubject {
            username: &user.username,
            external_id: user.external_id,
            roles: &roles,
            lab_code: user.lab_code.as_deref(),
        })
        .map_err(|e| {
            tracing::error!(error = %e, "token signing failed");
            ServiceError::Internal("TokenSigningError".to_string())
        })?;

    tracing::info!(
        username = %user.username,
        user_id = %user.external_id,
        roles = ?issued.roles,
        "login succeeded"
    );

    Ok(LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        user_id: user.external_id,
        username: user.username,
        roles: issued.roles,
        lab_code: issued.lab_code,
    })
}
