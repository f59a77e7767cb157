// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role repository.
//!
//! Roles are reference data: seeded when the store opens, resolved by name,
//! never created through the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::db::{all_rows, next_id, put_row, CredentialStore, StoreResult, ROLES};
use crate::auth::Role;

/// Role stored in the credential store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredRole {
    pub id: u64,
    pub name: Role,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for role lookups.
pub struct RoleRepository<'a> {
    store: &'a CredentialStore,
}

impl<'a> RoleRepository<'a> {
    /// Create a new RoleRepository.
    pub fn new(store: &'a CredentialStore) -> Self {
        Self { store }
    }

    /// Insert every known role that is not stored yet.
    pub fn seed_defaults(&self) -> StoreResult<()> {
        self.store.write(|txn| -> StoreResult<()> {
            let existing: Vec<StoredRole> = all_rows(&txn.open_table(ROLES)?)?;
            for role in Role::ALL {
                if existing.iter().any(|r| r.name == role) {
                    continue;
                }
                let id = next_id(txn, "roles")?;
                let now = Utc::now();
                let row = StoredRole {
                    id,
                    name: role,
                    description: role.description().to_string(),
                    created_at: now,
                    updated_at: now,
                };
                put_row(&mut txn.open_table(ROLES)?, id, &row)?;
                tracing::info!(role = %role, id, "seeded role");
            }
            Ok(())
        })
    }

    /// List all roles, in id order.
    pub fn list(&self) -> StoreResult<Vec<StoredRole>> {
        self.store.read(|txn| all_rows(&txn.open_table(ROLES)?))
    }

    /// Find a role by name.
    pub fn find_by_name(&self, name: Role) -> StoreResult<Option<StoredRole>> {
        Ok(self.list()?.into_iter().find(|r| r.name == name))
    }

    /// Resolve role ids to roles, skipping ids that no longer exist.
    pub fn resolve(&self, ids: &[u64]) -> StoreResult<Vec<StoredRole>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| ids.contains(&r.id))
            .collect())
    }
}
