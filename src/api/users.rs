// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User administration endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::{AdminOnly, Auth};
use crate::error::ApiError;
use crate::models::{CreateUserRequest, UpdateUserRequest, UserResponse};
use crate::services;
use crate::state::AuthState;

/// Create a user with the given roles.
#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    security(("bearer" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created", body = UserResponse),
        (status = 400, description = "Validation failed or unknown role"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Forbidden - admin role required"),
        (status = 409, description = "Username or email already in use"),
    )
)]
pub async fn create_user(
    State(state): State<AuthState>,
    AdminOnly(admin): AdminOnly,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    tracing::debug!(by = %admin.username, username = %request.username, "creating user");
    let user = services::users::create(&state.store, request)?;
    Ok((StatusCode::OK, Json(user)))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "Users",
    security(("bearer" = [])),
    params(("id" = u64, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation failed or unknown role"),
        (status = 403, description = "Forbidden - admin role required"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already in use"),
    )
)]
pub async fn update_user(
    State(state): State<AuthState>,
    AdminOnly(_caller): AdminOnly,
    Path(id): Path<u64>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = services::users::update(&state.store, id, request)?;
    Ok((StatusCode::OK, Json(user)))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    security(("bearer" = [])),
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Forbidden - admin role required"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn delete_user(
    State(state): State<AuthState>,
    AdminOnly(_caller): AdminOnly,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    services::users::delete(&state.store, id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    security(("bearer" = [])),
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 403, description = "Forbidden - admin role required"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn get_user(
    State(state): State<AuthState>,
    AdminOnly(_caller): AdminOnly,
    Path(id): Path<u64>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(services::users::get(&state.store, id)?))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 403, description = "Forbidden - admin role required"),
    )
)]
pub async fn list_users(
    State(state): State<AuthState>,
    AdminOnly(_caller): AdminOnly,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    Ok(Json(services::users::list(&state.store)?))
}

/// Get the account of the authenticated caller.
///
/// Any authenticated principal may call this; the user is resolved from
/// the token subject.
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User information", body = UserResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "User no longer exists"),
    )
)]
pub async fn get_current_user(
    State(state): State<AuthState>,
    Auth(user): Auth,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(services::users::me(&state.store, &user.username)?))
}
