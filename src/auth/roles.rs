// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Prefix used by the authority form of a role (`ROLE_ADMIN`).
pub const AUTHORITY_PREFIX: &str = "ROLE_";

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// - `Admin` - Full access to users, laboratories and every order
/// - `LabTech` - Read access to laboratories and to the orders of their own lab
///
/// The wire name (`ADMIN`, `LAB_TECH`) is what lands in the `roles` claim and in
/// the role table; matching is exact on the wire and case-insensitive only when
/// parsing operator input.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Full administrative access
    Admin,
    /// Laboratory technician, scoped to one lab code
    LabTech,
}

impl Role {
    /// Every role known to the services, in seeding order.
    pub const ALL: [Role; 2] = [Role::Admin, Role::LabTech];

    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::LabTech => "LAB_TECH",
        }
    }

    /// Human-readable description stored alongside the seeded role.
    pub fn description(&self) -> &'static str {
        match self {
            Role::Admin => "Administrator with full access",
            Role::LabTech => "Laboratory technician restricted to a single lab",
        }
    }

    /// Authority form consumed by route guards (`ROLE_<NAME>`).
    pub fn authority(&self) -> String {
        format!("{AUTHORITY_PREFIX}{}", self.as_str())
    }

    /// Parse a role from its exact wire name, as found in a verified token.
    pub fn from_claim(s: &str) -> Option<Role> {
        match s {
            "ADMIN" => Some(Role::Admin),
            "LAB_TECH" => Some(Role::LabTech),
            _ => None,
        }
    }

    /// Parse role from operator input (case-insensitive).
    pub fn from_str(s: &str) -> Option<Role> {
        Self::from_claim(&s.trim().to_uppercase())
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip_through_claims() {
        for role in Role::ALL {
            assert_eq!(Role::from_claim(role.as_str()), Some(role));
        }
    }

    #[test]
    fn claim_parsing_is_case_sensitive() {
        assert_eq!(Role::from_claim("lab_tech"), None);
        assert_eq!(Role::from_claim("Admin"), None);
    }

    #[test]
    fn from_str_parses_operator_input() {
        assert_eq!(Role::from_str("admin"), Some(Role::Admin));
        assert_eq!(Role::from_str(" Lab_Tech "), Some(Role::LabTech));
        assert_eq!(Role::from_str("auditor"), None);
    }

    #[test]
    fn authority_carries_prefix() {
        assert_eq!(Role::Admin.authority(), "ROLE_ADMIN");
        assert_eq!(Role::LabTech.authority(), "ROLE_LAB_TECH");
    }

    #[test]
    fn serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&Role::LabTech).unwrap();
        assert_eq!(json, "\"LAB_TECH\"");
    }
}
