// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! They read the principal the authentication gate left in the request
//! extensions, so they work with any router state:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::middleware::bearer_token;
use super::{AuthError, AuthenticatedUser, Role};

/// Extractor for authenticated users.
///
/// Rejects with 401 when the gate did not authenticate the request.
pub struct Auth(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        if bearer_token(&parts.headers).is_some() {
            Err(AuthError::InvalidToken)
        } else {
            Err(AuthError::MissingAuthHeader)
        }
    }
}

/// Require at least one of the given roles.
fn require_any(user: &AuthenticatedUser, roles: &[Role]) -> Result<(), AuthError> {
    if roles.iter().any(|r| user.has_role(*r)) {
        Ok(())
    } else {
        tracing::debug!(
            username = %user.username,
            authorities = ?user.authorities(),
            "insufficient permissions"
        );
        Err(AuthError::InsufficientPermissions)
    }
}

/// Extractor that requires admin role.
pub struct AdminOnly(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;
        require_any(&user, &[Role::Admin])?;
        Ok(AdminOnly(user))
    }
}

/// Extractor for read routes open to admins and lab technicians.
pub struct AdminOrLabTech(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for AdminOrLabTech {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;
        require_any(&user, &[Role::Admin, Role::LabTech])?;
        Ok(AdminOrLabTech(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use std::collections::BTreeSet;

    fn parts() -> Parts {
        Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    fn user(roles: &[Role]) -> AuthenticatedUser {
        AuthenticatedUser {
            username: "someone".to_string(),
            user_id: None,
            roles: roles.iter().copied().collect::<BTreeSet<_>>(),
            lab_code: None,
        }
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let mut parts = parts();
        let result = Auth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn rejected_token_is_reported_as_invalid() {
        let mut parts = Request::builder()
            .uri("/test")
            .header("Authorization", "Bearer forged.token.value")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let result = Auth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn auth_extractor_reads_extensions() {
        let mut parts = parts();
        parts.extensions.insert(user(&[Role::LabTech]));

        let Auth(found) = Auth::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(found.username, "someone");
    }

    #[tokio::test]
    async fn admin_only_rejects_lab_tech() {
        let mut parts = parts();
        parts.extensions.insert(user(&[Role::LabTech]));

        let result = AdminOnly::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::InsufficientPermissions)));
    }

    #[tokio::test]
    async fn admin_or_lab_tech_rejects_roleless_principal() {
        let mut parts = parts();
        parts.extensions.insert(user(&[]));
        let result = AdminOrLabTech::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::InsufficientPermissions)));

        let mut tech = self::parts();
        tech.extensions.insert(user(&[Role::LabTech]));
        assert!(AdminOrLabTech::from_request_parts(&mut tech, &()).await.is_ok());
    }
}
