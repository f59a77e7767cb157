// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::auth::AdminOnly;
use crate::error::ApiError;
use crate::models::RoleResponse;
use crate::services;
use crate::state::AuthState;

/// List the role catalog.
#[utoipa::path(
    get,
    path = "/roles",
    tag = "Roles",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Known roles", body = Vec<RoleResponse>),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Forbidden - admin role required"),
    )
)]
pub async fn list_roles(
    State(state): State<AuthState>,
    AdminOnly(_caller): AdminOnly,
) -> Result<Json<Vec<RoleResponse>>, ApiError> {
    Ok(Json(services::users::roles(&state.store)?))
}
