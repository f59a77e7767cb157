// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the credential store.
//!
//! Each repository provides CRUD operations for a specific entity type,
//! using [`CredentialStore`](super::CredentialStore) transactions for all
//! reads and writes.

pub mod laboratories;
pub mod orders;
pub mod roles;
pub mod users;

pub use laboratories::{LabLookup, LaboratoryRepository, NewLaboratory, StoredLaboratory};
pub use orders::{OrderFilter, OrderRecord, OrderRepository, StoredOrder};
pub use roles::{RoleRepository, StoredRole};
pub use users::{NewUser, StoredUser, UserRepository};
