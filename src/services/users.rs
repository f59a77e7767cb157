// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User administration.
//!
//! A user holding `LAB_TECH` must always have a non-blank lab code. The rule
//! is checked before the store is touched on create, and inside the update
//! transaction against the final role set and lab code on update.

use crate::auth::password::hash_password;
use crate::auth::Role;
use crate::models::{CreateUserRequest, RoleResponse, UpdateUserRequest, UserResponse};
use crate::storage::{
    CredentialStore, NewUser, RoleRepository, StoreError, StoredRole, StoredUser, UserRepository,
};

use super::validation::{non_blank, Violations};
use super::{ServiceError, ServiceResult};

const LAB_CODE_REQUIRED: &str = "labCode is required for LAB_TECH";

fn user_not_found() -> ServiceError {
    ServiceError::NotFound("User not found".to_string())
}

fn conflict(err: StoreError) -> ServiceError {
    match err {
        StoreError::Conflict("username") => ServiceError::Conflict("username already in use".into()),
        StoreError::Conflict("email") => ServiceError::Conflict("email already in use".into()),
        StoreError::NotFound(_) => user_not_found(),
        other => other.into(),
    }
}

fn hash(password: &str) -> ServiceResult<String> {
    hash_password(password).map_err(|e| {
        tracing::error!(error = %e, "password hashing failed");
        ServiceError::Internal("PasswordHashError".to_string())
    })
}

/// Resolve role names (case-insensitive) to stored roles.
fn resolve_roles(catalog: &[StoredRole], names: &[String]) -> ServiceResult<Vec<StoredRole>> {
    let mut resolved: Vec<StoredRole> = Vec::new();
    for name in names {
        let stored = Role::from_str(name)
            .and_then(|role| catalog.iter().find(|r| r.name == role))
            .ok_or_else(|| ServiceError::BadRequest(format!("invalid role: {name}")))?;
        if !resolved.iter().any(|r| r.id == stored.id) {
            resolved.push(stored.clone());
        }
    }
    if resolved.is_empty() {
        return Err(ServiceError::BadRequest("at least one role is required".to_string()));
    }
    Ok(resolved)
}

fn holds(catalog: &[StoredRole], role_ids: &[u64], role: Role) -> bool {
    catalog.iter().any(|r| r.name == role && role_ids.contains(&r.id))
}

fn to_response(catalog: &[StoredRole], user: StoredUser) -> UserResponse {
    let mut roles: Vec<String> = catalog
        .iter()
        .filter(|r| user.role_ids.contains(&r.id))
        .map(|r| r.name.as_str().to_string())
        .collect();
    roles.sort();

    UserResponse {
        id: user.id,
        external_id: user.external_id,
        username: user.username,
        email: user.email,
        lab_code: user.lab_code,
        active: user.active,
        roles,
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}

fn validate_create(request: &CreateUserRequest) -> ServiceResult<()> {
    let mut v = Violations::new();
    v.required("username", &request.username, 150);
    v.email("email", &request.email);
    v.length("password", &request.password, 8, 120);
    if let Some(code) = non_blank(request.lab_code.as_deref()) {
        v.lab_code("labCode", &code);
    }
    if request.roles.is_empty() {
        v.add("roles", "must not be empty");
    }
    for role in &request.roles {
        v.role_name("roles", &role.trim().to_ascii_uppercase());
    }
    if request.active.is_none() {
        v.add("active", "must not be null");
    }
    v.finish()
}

fn validate_update(request: &UpdateUserRequest) -> ServiceResult<()> {
    let mut v = Violations::new();
    if let Some(email) = &request.email {
        v.email("email", email);
    }
    if let Some(password) = &request.password {
        v.length("password", password, 8, 120);
    }
    if let Some(code) = non_blank(request.lab_code.as_deref()) {
        v.lab_code("labCode", &code);
    }
    if let Some(roles) = &request.roles {
        for role in roles {
            v.role_name("roles", &role.trim().to_ascii_uppercase());
        }
    }
    v.finish()
}

/// Create a user.
pub fn create(store: &CredentialStore, request: CreateUserRequest) -> ServiceResult<UserResponse> {
    validate_create(&request)?;

    let catalog = RoleRepository::new(store).list()?;
    let roles = resolve_roles(&catalog, &request.roles)?;
    let lab_code = non_blank(request.lab_code.as_deref());
    if roles.iter().any(|r| r.name == Role::LabTech) && lab_code.is_none() {
        return Err(ServiceError::BadRequest(LAB_CODE_REQUIRED.to_string()));
    }

    let user = UserRepository::new(store)
        .create(NewUser {
            username: request.username.trim().to_string(),
            email: request.email.trim().to_string(),
            password_hash: hash(&request.password)?,
            lab_code,
            active: request.active.unwrap_or(true),
            role_ids: roles.iter().map(|r| r.id).collect(),
        })
        .map_err(conflict)?;

    tracing::info!(user_id = %user.external_id, username = %user.username, "user created");
    Ok(to_response(&catalog, user))
}

/// Apply a partial update. Nothing is written if any rule fails.
pub fn update(
    store: &CredentialStore,
    id: u64,
    request: UpdateUserRequest,
) -> ServiceResult<UserResponse> {
    validate_update(&request)?;

    let catalog = RoleRepository::new(store).list()?;
    let role_ids = match &request.roles {
        Some(names) => Some(resolve_roles(&catalog, names)?.iter().map(|r| r.id).collect()),
        None => None,
    };
    let password_hash = match &request.password {
        Some(password) => Some(hash(password)?),
        None => None,
    };

    let user = UserRepository::new(store)
        .update(id, |user| {
            if let Some(email) = &request.email {
                user.email = email.trim().to_string();
            }
            if let Some(hash) = password_hash {
                user.password_hash = hash;
            }
            if request.lab_code.is_some() {
                user.lab_code = non_blank(request.lab_code.as_deref());
            }
            if let Some(ids) = role_ids {
                user.role_ids = ids;
            }
            if let Some(active) = request.active {
                user.active = active;
            }

            let lab_code_missing = user.lab_code.as_deref().is_none_or(|c| c.trim().is_empty());
            if holds(&catalog, &user.role_ids, Role::LabTech) && lab_code_missing {
                return Err(ServiceError::BadRequest(LAB_CODE_REQUIRED.to_string()));
            }
            Ok(())
        })
        .map_err(|e| match e {
            ServiceError::NotFound(_) => user_not_found(),
            other => other,
        })?;

    tracing::info!(user_id = %user.external_id, username = %user.username, "user updated");
    Ok(to_response(&catalog, user))
}

/// Hard-delete a user.
pub fn delete(store: &CredentialStore, id: u64) -> ServiceResult<()> {
    UserRepository::new(store).delete(id).map_err(conflict)?;
    tracing::info!(id, "user deleted");
    Ok(())
}

pub fn get(store: &CredentialStore, id: u64) -> ServiceResult<UserResponse> {
    let user = UserRepository::new(store).get(id)?.ok_or_else(user_not_found)?;
    let catalog = RoleRepository::new(store).list()?;
    Ok(to_response(&catalog, user))
}

pub fn list(store: &CredentialStore) -> ServiceResult<Vec<UserResponse>> {
    let catalog = RoleRepository::new(store).list()?;
    Ok(UserRepository::new(store)
        .list()?
        .into_iter()
        .map(|u| to_response(&catalog, u))
        .collect())
}

/// The caller's own record, by the username in their token.
pub fn me(store: &CredentialStore, username: &str) -> ServiceResult<UserResponse> {
    let user = UserRepository::new(store)
        .find_by_username(username)?
        .ok_or_else(user_not_found)?;
    let catalog = RoleRepository::new(store).list()?;
    Ok(to_response(&catalog, user))
}

pub fn roles(store: &CredentialStore) -> ServiceResult<Vec<RoleResponse>> {
    Ok(RoleRepository::new(store)
        .list()?
        .into_iter()
        .map(|r| RoleResponse {
            id: r.id,
            name: r.name,
            description: r.description,
        })
        .collect())
}

/// Create an ADMIN account if the store has no users yet.
///
/// Returns whether a user was created.
pub fn seed_admin(
    store: &CredentialStore,
    username: &str,
    password: &str,
    email: &str,
) -> ServiceResult<bool> {
    if UserRepository::new(store).count()? > 0 {
        return Ok(false);
    }
    create(
        store,
        CreateUserRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            lab_code: None,
            roles: vec![Role::Admin.as_str().to_string()],
            active: Some(true),
        },
    )?;
    tracing::info!(username, "seeded admin user");
    Ok(true)
}
