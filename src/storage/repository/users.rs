// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository.
//!
//! A user row owns its role memberships (`role_ids`). Username, email and
//! external id are unique; the index tables are updated in the same write
//! transaction as the row, so a failed write leaves no partial state.

use chrono::{DateTime, Utc};
use redb::{ReadableTableMetadata, WriteTransaction};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::super::db::{
    all_rows, get_row, index_claim, index_get, index_move, next_id, put_row, yes_no,
    CredentialStore, StoreError, StoreResult, USERS, USER_EMAIL_IDX, USER_EXTERNAL_ID_IDX,
    USER_USERNAME_IDX,
};

/// User stored in the credential store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    pub id: u64,
    pub external_id: Uuid,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string; never the plaintext
    pub password_hash: String,
    pub lab_code: Option<String>,
    #[serde(with = "yes_no")]
    pub active: bool,
    pub role_ids: Vec<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a user; ids and timestamps are store-owned.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub lab_code: Option<String>,
    pub active: bool,
    pub role_ids: Vec<u64>,
}

/// Repository for user operations.
pub struct UserRepository<'a> {
    store: &'a CredentialStore,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository.
    pub fn new(store: &'a CredentialStore) -> Self {
        Self { store }
    }

    /// Insert a user, enforcing username and email uniqueness.
    pub fn create(&self, new: NewUser) -> StoreResult<StoredUser> {
        self.store.write(|txn| -> StoreResult<StoredUser> {
            let mut by_username = txn.open_table(USER_USERNAME_IDX)?;
            if index_get(&by_username, &new.username)?.is_some() {
                return Err(StoreError::Conflict("username"));
            }
            let mut by_email = txn.open_table(USER_EMAIL_IDX)?;
            if index_get(&by_email, &new.email)?.is_some() {
                return Err(StoreError::Conflict("email"));
            }

            let id = next_id(txn, "users")?;
            let now = Utc::now();
            let user = StoredUser {
                id,
                external_id: Uuid::new_v4(),
                username: new.username,
                email: new.email,
                password_hash: new.password_hash,
                lab_code: new.lab_code,
                active: new.active,
                role_ids: new.role_ids,
                created_at: now,
                updated_at: now,
            };

            index_claim(&mut by_username, &user.username, id, "username")?;
            index_claim(&mut by_email, &user.email, id, "email")?;
            index_claim(
                &mut txn.open_table(USER_EXTERNAL_ID_IDX)?,
                &user.external_id.to_string(),
                id,
                "external_id",
            )?;
            put_row(&mut txn.open_table(USERS)?, id, &user)?;
            Ok(user)
        })
    }

    /// Get a user by internal id.
    pub fn get(&self, id: u64) -> StoreResult<Option<StoredUser>> {
        self.store.read(|txn| get_row(&txn.open_table(USERS)?, id))
    }

    /// Find a user by exact username.
    pub fn find_by_username(&self, username: &str) -> StoreResult<Option<StoredUser>> {
        self.store.read(|txn| {
            let index = txn.open_table(USER_USERNAME_IDX)?;
            match index_get(&index, username)? {
                Some(id) => get_row(&txn.open_table(USERS)?, id),
                None => Ok(None),
            }
        })
    }

    /// List all users, in id order.
    pub fn list(&self) -> StoreResult<Vec<StoredUser>> {
        self.store.read(|txn| all_rows(&txn.open_table(USERS)?))
    }

    /// Number of stored users.
    pub fn count(&self) -> StoreResult<u64> {
        self.store.read(|txn| Ok(txn.open_table(USERS)?.len()?))
    }

    /// Read-modify-write one user in a single transaction.
    ///
    /// `apply` sees the current row and may reject the change; nothing is
    /// written in that case. Username and external id are immutable.
    pub fn update<E>(
        &self,
        id: u64,
        apply: impl FnOnce(&mut StoredUser) -> Result<(), E>,
    ) -> Result<StoredUser, E>
    where
        E: From<StoreError>,
    {
        self.store.write(|txn| {
            let current = load(txn, id)?;

            let mut user = current.clone();
            apply(&mut user)?;
            user.id = current.id;
            user.username = current.username.clone();
            user.external_id = current.external_id;
            user.created_at = current.created_at;
            user.updated_at = Utc::now();

            save(txn, &current, &user)?;
            Ok(user)
        })
    }

    /// Hard-delete a user and its index entries.
    pub fn delete(&self, id: u64) -> StoreResult<()> {
        self.store.write(|txn| -> StoreResult<()> {
            let user = load(txn, id)?;

            txn.open_table(USER_USERNAME_IDX)?.remove(user.username.as_str())?;
            txn.open_table(USER_EMAIL_IDX)?.remove(user.email.as_str())?;
            txn.open_table(USER_EXTERNAL_ID_IDX)?
                .remove(user.external_id.to_string().as_str())?;
            txn.open_table(USERS)?.remove(id)?;
            Ok(())
        })
    }
}

fn load(txn: &WriteTransaction, id: u64) -> StoreResult<StoredUser> {
    get_row(&txn.open_table(USERS)?, id)?
        .ok_or_else(|| StoreError::NotFound(format!("User not found id={id}")))
}

fn save(txn: &WriteTransaction, current: &StoredUser, user: &StoredUser) -> StoreResult<()> {
    index_move(
        &mut txn.open_table(USER_EMAIL_IDX)?,
        &current.email,
        &user.email,
        user.id,
        "email",
    )?;
    put_row(&mut txn.open_table(USERS)?, user.id, user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (CredentialStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::open(&dir.path().join("users.redb")).unwrap();
        (store, dir)
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            lab_code: None,
            active: true,
            role_ids: vec![1],
        }
    }

    #[test]
    fn create_and_find() {
        let (store, _dir) = store();
        let repo = UserRepository::new(&store);
        let created = repo.create(new_user("admin", "admin@example.com")).unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(repo.get(1).unwrap(), Some(created.clone()));
        assert_eq!(repo.find_by_username("admin").unwrap(), Some(created));
        assert_eq!(repo.find_by_username("Admin").unwrap(), None);
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn duplicate_username_conflicts_and_leaves_one_row() {
        let (store, _dir) = store();
        let repo = UserRepository::new(&store);
        repo.create(new_user("tech1", "a@example.com")).unwrap();

        let err = repo.create(new_user("tech1", "b@example.com")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict("username")));
        assert_eq!(repo.count().unwrap(), 1);
        // The failed create did not claim the email.
        repo.create(new_user("tech2", "b@example.com")).unwrap();
    }

    #[test]
    fn duplicate_email_conflicts() {
        let (store, _dir) = store();
        let repo = UserRepository::new(&store);
        repo.create(new_user("a", "same@example.com")).unwrap();
        let err = repo.create(new_user("b", "same@example.com")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict("email")));
    }

    #[test]
    fn update_moves_email_index() {
        let (store, _dir) = store();
        let repo = UserRepository::new(&store);
        let user = repo.create(new_user("a", "old@example.com")).unwrap();
        repo.create(new_user("b", "taken@example.com")).unwrap();

        let err = repo
            .update(user.id, |u| -> StoreResult<()> {
                u.email = "taken@example.com".to_string();
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict("email")));

        let updated = repo
            .update(user.id, |u| -> StoreResult<()> {
                u.email = "new@example.com".to_string();
                u.username = "ignored".to_string();
                Ok(())
            })
            .unwrap();
        assert_eq!(updated.email, "new@example.com");
        assert_eq!(updated.username, "a");

        // Old address is free again.
        repo.create(new_user("c", "old@example.com")).unwrap();
    }

    #[test]
    fn rejected_update_writes_nothing() {
        let (store, _dir) = store();
        let repo = UserRepository::new(&store);
        let user = repo.create(new_user("a", "a@example.com")).unwrap();

        let result = repo.update(user.id, |u| {
            u.active = false;
            Err(StoreError::NotFound("nope".to_string()))
        });
        assert!(result.is_err());
        assert!(repo.get(user.id).unwrap().unwrap().active);
    }

    #[test]
    fn delete_frees_unique_values() {
        let (store, _dir) = store();
        let repo = UserRepository::new(&store);
        let user = repo.create(new_user("a", "a@example.com")).unwrap();
        repo.delete(user.id).unwrap();

        assert_eq!(repo.get(user.id).unwrap(), None);
        assert!(matches!(repo.delete(user.id), Err(StoreError::NotFound(_))));
        repo.create(new_user("a", "a@example.com")).unwrap();
    }

    #[test]
    fn active_flag_is_stored_as_y_n() {
        let (store, _dir) = store();
        let user = UserRepository::new(&store)
            .create(new_user("a", "a@example.com"))
            .unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["active"], "Y");
    }
}
