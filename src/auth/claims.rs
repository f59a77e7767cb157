// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::roles::Role;

/// Claim set signed into every access token.
///
/// `labCode` is only present for tokens whose roles include `LAB_TECH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (username)
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix seconds)
    pub iat: i64,

    /// Expiration (Unix seconds)
    pub exp: i64,

    /// External id of the user
    #[serde(rename = "userId")]
    pub user_id: String,

    /// Role names, sorted ascending
    pub roles: Vec<String>,

    /// Lab scope of a LAB_TECH token
    #[serde(rename = "labCode", default, skip_serializing_if = "Option::is_none")]
    pub lab_code: Option<String>,
}

/// Claims as read back from a token that passed verification.
///
/// Custom claims are read leniently: `userId` and `labCode` may be any JSON
/// scalar and are stringified, a missing `roles` claim is an empty list.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedClaims {
    /// Subject (username)
    pub sub: String,

    /// Issuer, if the token carries one
    #[serde(default)]
    pub iss: Option<String>,

    /// Expiration (Unix seconds)
    pub exp: i64,

    #[serde(rename = "userId", default, deserialize_with = "lenient_string")]
    pub user_id: Option<String>,

    #[serde(rename = "labCode", default, deserialize_with = "lenient_string")]
    pub lab_code: Option<String>,

    #[serde(default)]
    pub roles: Vec<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Authenticated principal derived from a verified token.
///
/// This is the type handlers receive for the remainder of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Username (token subject)
    pub username: String,

    /// External id of the user, when the token carries one
    pub user_id: Option<String>,

    /// Known roles from the `roles` claim; unrecognised names are dropped
    pub roles: BTreeSet<Role>,

    /// Lab scope from the `labCode` claim
    pub lab_code: Option<String>,
}

impl AuthenticatedUser {
    /// Build the principal from verified claims.
    pub fn from_claims(claims: VerifiedClaims) -> Self {
        let roles = claims
            .roles
            .iter()
            .filter_map(|r| Role::from_claim(r))
            .collect();

        Self {
            username: claims.sub,
            user_id: claims.user_id,
            roles,
            lab_code: claims.lab_code,
        }
    }

    /// Check if the user holds the given role.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Check if this user is an admin.
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Authority strings (`ROLE_ADMIN`, ...) for logging and route guards.
    pub fn authorities(&self) -> Vec<String> {
        self.roles.iter().map(Role::authority).collect()
    }

    /// Lab code from the token, treating a blank claim as absent.
    pub fn lab_scope(&self) -> Option<&str> {
        self.lab_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}
