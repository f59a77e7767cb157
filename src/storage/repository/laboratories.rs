// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Laboratory repository.
//!
//! Code and name are unique. Supported tests are an ordered list serialized
//! with the row.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, Table, WriteTransaction};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::super::db::{
    all_rows, get_row, index_claim, index_get, index_move, next_id, put_row, yes_no,
    CredentialStore, StoreError, StoreResult, LABORATORIES, LAB_CODE_IDX, LAB_NAME_IDX,
};

/// Laboratory stored in the credential store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredLaboratory {
    pub id: u64,
    pub external_id: Uuid,
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[serde(with = "yes_no")]
    pub active: bool,
    #[serde(default)]
    pub supported_tests: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when registering a laboratory.
#[derive(Debug, Clone)]
pub struct NewLaboratory {
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub supported_tests: Vec<String>,
}

/// Laboratory lookups bound to an open write transaction.
///
/// Lets another aggregate (an order) resolve its lab reference inside its
/// own transaction.
pub struct LabLookup<'txn> {
    labs: Table<'txn, u64, &'static [u8]>,
    by_code: Table<'txn, &'static str, u64>,
}

impl<'txn> LabLookup<'txn> {
    pub(crate) fn open(txn: &'txn WriteTransaction) -> StoreResult<Self> {
        Ok(Self {
            labs: txn.open_table(LABORATORIES)?,
            by_code: txn.open_table(LAB_CODE_IDX)?,
        })
    }

    /// Find a laboratory by exact code.
    pub fn by_code(&self, code: &str) -> StoreResult<Option<StoredLaboratory>> {
        match index_get(&self.by_code, code)? {
            Some(id) => get_row(&self.labs, id),
            None => Ok(None),
        }
    }

    /// Find a laboratory by id.
    pub fn by_id(&self, id: u64) -> StoreResult<Option<StoredLaboratory>> {
        get_row(&self.labs, id)
    }
}

/// Repository for laboratory operations.
pub struct LaboratoryRepository<'a> {
    store: &'a CredentialStore,
}

impl<'a> LaboratoryRepository<'a> {
    /// Create a new LaboratoryRepository.
    pub fn new(store: &'a CredentialStore) -> Self {
        Self { store }
    }

    /// Register a laboratory. New laboratories are active.
    pub fn create(&self, new: NewLaboratory) -> StoreResult<StoredLaboratory> {
        self.store.write(|txn| -> StoreResult<StoredLaboratory> {
            let mut by_code = txn.open_table(LAB_CODE_IDX)?;
            if index_get(&by_code, &new.code)?.is_some() {
                return Err(StoreError::Conflict("code"));
            }
            let mut by_name = txn.open_table(LAB_NAME_IDX)?;
            if index_get(&by_name, &new.name)?.is_some() {
                return Err(StoreError::Conflict("name"));
            }

            let id = next_id(txn, "laboratories")?;
            let now = Utc::now();
            let lab = StoredLaboratory {
                id,
                external_id: Uuid::new_v4(),
                code: new.code,
                name: new.name,
                address: new.address,
                phone: new.phone,
                active: true,
                supported_tests: new.supported_tests,
                created_at: now,
                updated_at: now,
            };

            index_claim(&mut by_code, &lab.code, id, "code")?;
            index_claim(&mut by_name, &lab.name, id, "name")?;
            put_row(&mut txn.open_table(LABORATORIES)?, id, &lab)?;
            Ok(lab)
        })
    }

    /// Get a laboratory by id.
    pub fn get(&self, id: u64) -> StoreResult<Option<StoredLaboratory>> {
        self.store.read(|txn| get_row(&txn.open_table(LABORATORIES)?, id))
    }

    /// Find a laboratory by exact code.
    pub fn find_by_code(&self, code: &str) -> StoreResult<Option<StoredLaboratory>> {
        self.store.read(|txn| {
            let index = txn.open_table(LAB_CODE_IDX)?;
            match index.get(code)? {
                Some(id) => get_row(&txn.open_table(LABORATORIES)?, id.value()),
                None => Ok(None),
            }
        })
    }

    /// List laboratories in creation order, optionally by active flag.
    pub fn list(&self, active: Option<bool>) -> StoreResult<Vec<StoredLaboratory>> {
        let mut labs: Vec<StoredLaboratory> =
            self.store.read(|txn| all_rows(&txn.open_table(LABORATORIES)?))?;
        if let Some(active) = active {
            labs.retain(|lab| lab.active == active);
        }
        labs.sort_by_key(|lab| (lab.created_at, lab.id));
        Ok(labs)
    }

    /// Read-modify-write one laboratory in a single transaction.
    ///
    /// Code and name uniqueness are re-checked when they change.
    pub fn update<E>(
        &self,
        id: u64,
        apply: impl FnOnce(&mut StoredLaboratory) -> Result<(), E>,
    ) -> Result<StoredLaboratory, E>
    where
        E: From<StoreError>,
    {
        self.store.write(|txn| {
            let current = load(txn, id)?;

            let mut lab = current.clone();
            apply(&mut lab)?;
            lab.id = current.id;
            lab.external_id = current.external_id;
            lab.created_at = current.created_at;
            lab.updated_at = Utc::now();

            save(txn, &current, &lab)?;
            Ok(lab)
        })
    }
}

fn load(txn: &WriteTransaction, id: u64) -> StoreResult<StoredLaboratory> {
    get_row(&txn.open_table(LABORATORIES)?, id)?
        .ok_or_else(|| StoreError::NotFound(format!("Laboratory not found id={id}")))
}

fn save(txn: &WriteTransaction, current: &StoredLaboratory, lab: &StoredLaboratory) -> StoreResult<()> {
    index_move(
        &mut txn.open_table(LAB_CODE_IDX)?,
        &current.code,
        &lab.code,
        lab.id,
        "code",
    )?;
    index_move(
        &mut txn.open_table(LAB_NAME_IDX)?,
        &current.name,
        &lab.name,
        lab.id,
        "name",
    )?;
    put_row(&mut txn.open_table(LABORATORIES)?, lab.id, lab)
}
