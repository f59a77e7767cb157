// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: id → serialized StoredUser
//! - `user_username_idx` / `user_email_idx` / `user_external_id_idx`: value → user id
//! - `roles`: id → serialized StoredRole
//! - `laboratories`: id → serialized StoredLaboratory
//! - `lab_code_idx` / `lab_name_idx`: value → laboratory id
//! - `orders`: id → serialized StoredOrder
//! - `sequences`: table name → last issued id
//!
//! Rows are JSON bytes. Unique constraints live in the index tables and are
//! checked inside the same write transaction that changes the row.
//!
//! redb admits one write transaction at a time, so every read-modify-write
//! done through [`CredentialStore::write`] is serialised against all others.

use std::path::Path;

use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, Table, TableDefinition,
    WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");
pub(crate) const USER_USERNAME_IDX: TableDefinition<&str, u64> =
    TableDefinition::new("user_username_idx");
pub(crate) const USER_EMAIL_IDX: TableDefinition<&str, u64> =
    TableDefinition::new("user_email_idx");
pub(crate) const USER_EXTERNAL_ID_IDX: TableDefinition<&str, u64> =
    TableDefinition::new("user_external_id_idx");

pub(crate) const ROLES: TableDefinition<u64, &[u8]> = TableDefinition::new("roles");

pub(crate) const LABORATORIES: TableDefinition<u64, &[u8]> = TableDefinition::new("laboratories");
pub(crate) const LAB_CODE_IDX: TableDefinition<&str, u64> = TableDefinition::new("lab_code_idx");
pub(crate) const LAB_NAME_IDX: TableDefinition<&str, u64> = TableDefinition::new("lab_name_idx");

pub(crate) const ORDERS: TableDefinition<u64, &[u8]> = TableDefinition::new("orders");

/// Sequence counters: table name → last issued id.
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Unique constraint violation on the named field.
    #[error("unique constraint violated: {0}")]
    Conflict(&'static str),

    #[error("{0}")]
    NotFound(String),
}

impl StoreError {
    /// Short category name, safe to expose in error responses.
    pub fn category(&self) -> &'static str {
        match self {
            StoreError::Serde(_) => "SerializationError",
            StoreError::Io(_) => "IoError",
            StoreError::Conflict(_) => "ConstraintViolation",
            StoreError::NotFound(_) => "NotFound",
            _ => "StoreError",
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Row helpers
// =============================================================================

/// Read and decode a JSON row.
pub(crate) fn get_row<R, T>(table: &T, id: u64) -> StoreResult<Option<R>>
where
    R: DeserializeOwned,
    T: ReadableTable<u64, &'static [u8]>,
{
    match table.get(id)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

/// Decode every row of a table, in id order.
pub(crate) fn all_rows<R, T>(table: &T) -> StoreResult<Vec<R>>
where
    R: DeserializeOwned,
    T: ReadableTable<u64, &'static [u8]>,
{
    let mut rows = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        rows.push(serde_json::from_slice(value.value())?);
    }
    Ok(rows)
}

/// Encode and write a JSON row.
pub(crate) fn put_row<R: Serialize>(
    table: &mut Table<'_, u64, &'static [u8]>,
    id: u64,
    row: &R,
) -> StoreResult<()> {
    let json = serde_json::to_vec(row)?;
    table.insert(id, json.as_slice())?;
    Ok(())
}

/// Look up an id in a unique index.
pub(crate) fn index_get<T>(index: &T, key: &str) -> StoreResult<Option<u64>>
where
    T: ReadableTable<&'static str, u64>,
{
    Ok(index.get(key)?.map(|v| v.value()))
}

/// Claim `key` for `id` in a unique index.
///
/// Fails with [`StoreError::Conflict`] if another row already holds it.
pub(crate) fn index_claim(
    index: &mut Table<'_, &'static str, u64>,
    key: &str,
    id: u64,
    field: &'static str,
) -> StoreResult<()> {
    if let Some(owner) = index_get(index, key)? {
        if owner != id {
            return Err(StoreError::Conflict(field));
        }
        return Ok(());
    }
    index.insert(key, id)?;
    Ok(())
}

/// Move a unique index entry from `old` to `new` for the same row.
pub(crate) fn index_move(
    index: &mut Table<'_, &'static str, u64>,
    old: &str,
    new: &str,
    id: u64,
    field: &'static str,
) -> StoreResult<()> {
    if old == new {
        return Ok(());
    }
    index_claim(index, new, id, field)?;
    index.remove(old)?;
    Ok(())
}

/// Issue the next id for a table.
pub(crate) fn next_id(txn: &WriteTransaction, sequence: &str) -> StoreResult<u64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let next = index_get(&table, sequence)?.unwrap_or(0) + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

// =============================================================================
// CredentialStore
// =============================================================================

/// Embedded ACID store for users, roles, laboratories and orders.
pub struct CredentialStore {
    db: Database,
}

impl CredentialStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_USERNAME_IDX)?;
            let _ = write_txn.open_table(USER_EMAIL_IDX)?;
            let _ = write_txn.open_table(USER_EXTERNAL_ID_IDX)?;
            let _ = write_txn.open_table(ROLES)?;
            let _ = write_txn.open_table(LABORATORIES)?;
            let _ = write_txn.open_table(LAB_CODE_IDX)?;
            let _ = write_txn.open_table(LAB_NAME_IDX)?;
            let _ = write_txn.open_table(ORDERS)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        let store = Self { db };
        super::repository::RoleRepository::new(&store).seed_defaults()?;
        Ok(store)
    }

    /// Run `f` inside one write transaction.
    ///
    /// Commits when `f` succeeds; aborts and discards every change otherwise.
    pub(crate) fn write<T, E>(
        &self,
        f: impl FnOnce(&WriteTransaction) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let txn = self.db.begin_write().map_err(StoreError::from)?;
        match f(&txn) {
            Ok(value) => {
                txn.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort) = txn.abort() {
                    tracing::warn!(error = %abort, "failed to abort write transaction");
                }
                Err(e)
            }
        }
    }

    /// Run `f` against a read snapshot.
    pub(crate) fn read<T>(
        &self,
        f: impl FnOnce(&ReadTransaction) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let txn = self.db.begin_read()?;
        f(&txn)
    }

    /// Readiness probe: a read transaction can be opened and a table read.
    pub fn check_health(&self) -> StoreResult<()> {
        self.read(|txn| {
            let roles = txn.open_table(ROLES)?;
            let _ = roles.first()?;
            Ok(())
        })
    }
}

/// Serde adapter storing booleans as `"Y"` / `"N"`.
pub(crate) mod yes_no {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "Y" } else { "N" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "Y" | "y" => Ok(true),
            "N" | "n" => Ok(false),
            other => Err(D::Error::custom(format!("expected Y or N, got {other:?}"))),
        }
    }
}
