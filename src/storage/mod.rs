// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent storage for both services, on an embedded redb database.
//! Each service opens its own database file under `DATA_DIR`:
//!
//! ```text
//! {DATA_DIR}/
//!   auth.redb    # users, roles (ms-auth)
//!   lab.redb     # laboratories, orders (ms-lab)
//! ```
//!
//! ## Important Notes
//!
//! - Every mutation is a single write transaction; a failed operation
//!   leaves no partial state
//! - Password hashes are stored, plaintext passwords never are
//! - Boolean flags are persisted as `"Y"` / `"N"`

pub mod db;
pub mod repository;

pub use db::{CredentialStore, StoreError, StoreResult};
pub use repository::{
    LabLookup, LaboratoryRepository, NewLaboratory, NewUser, OrderFilter, OrderRecord,
    OrderRepository, RoleRepository, StoredLaboratory, StoredOrder, StoredRole, StoredUser,
    UserRepository,
};
