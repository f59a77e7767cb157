// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Laboratory endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::auth::{AdminOnly, AdminOrLabTech};
use crate::error::ApiError;
use crate::models::{CreateLabRequest, LabListQuery, LabResponse, PageResponse, UpdateLabRequest};
use crate::services;
use crate::state::LabState;

#[utoipa::path(
    post,
    path = "/labs",
    tag = "Laboratories",
    security(("bearer" = [])),
    request_body = CreateLabRequest,
    responses(
        (status = 201, description = "Laboratory created", body = LabResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Forbidden - admin role required"),
        (status = 409, description = "Code or name already exists"),
    )
)]
pub async fn create_lab(
    State(state): State<LabState>,
    AdminOnly(_caller): AdminOnly,
    Json(request): Json<CreateLabRequest>,
) -> Result<(StatusCode, Json<LabResponse>), ApiError> {
    let lab = services::labs::create(&state.store, request)?;
    Ok((StatusCode::CREATED, Json(lab)))
}

#[utoipa::path(
    put,
    path = "/labs/{id}",
    tag = "Laboratories",
    security(("bearer" = [])),
    params(("id" = u64, Path, description = "Laboratory id")),
    request_body = UpdateLabRequest,
    responses(
        (status = 200, description = "Laboratory updated", body = LabResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Forbidden - admin role required"),
        (status = 404, description = "Laboratory not found"),
        (status = 409, description = "Code or name already exists"),
    )
)]
pub async fn update_lab(
    State(state): State<LabState>,
    AdminOnly(_caller): AdminOnly,
    Path(id): Path<u64>,
    Json(request): Json<UpdateLabRequest>,
) -> Result<Json<LabResponse>, ApiError> {
    Ok(Json(services::labs::update(&state.store, id, request)?))
}

#[utoipa::path(
    get,
    path = "/labs/{id}",
    tag = "Laboratories",
    security(("bearer" = [])),
    params(("id" = u64, Path, description = "Laboratory id")),
    responses(
        (status = 200, description = "Laboratory", body = LabResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "Laboratory not found"),
    )
)]
pub async fn get_lab(
    State(state): State<LabState>,
    AdminOrLabTech(_caller): AdminOrLabTech,
    Path(id): Path<u64>,
) -> Result<Json<LabResponse>, ApiError> {
    Ok(Json(services::labs::get(&state.store, id)?))
}

/// Paged laboratory list, optionally filtered by `active`.
#[utoipa::path(
    get,
    path = "/labs",
    tag = "Laboratories",
    security(("bearer" = [])),
    params(LabListQuery),
    responses(
        (status = 200, description = "Laboratories", body = PageResponse<LabResponse>),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn list_labs(
    State(state): State<LabState>,
    AdminOrLabTech(_caller): AdminOrLabTech,
    Query(query): Query<LabListQuery>,
) -> Result<Json<PageResponse<LabResponse>>, ApiError> {
    Ok(Json(services::labs::list(&state.store, &query)?))
}

#[utoipa::path(
    post,
    path = "/labs/{id}/activate",
    tag = "Laboratories",
    security(("bearer" = [])),
    params(("id" = u64, Path, description = "Laboratory id")),
    responses(
        (status = 200, description = "Laboratory activated", body = LabResponse),
        (status = 403, description = "Forbidden - admin role required"),
        (status = 404, description = "Laboratory not found"),
    )
)]
pub async fn activate_lab(
    State(state): State<LabState>,
    AdminOnly(_caller): AdminOnly,
    Path(id): Path<u64>,
) -> Result<Json<LabResponse>, ApiError> {
    Ok(Json(services::labs::set_active(&state.store, id, true)?))
}

#[utoipa::path(
    post,
    path = "/labs/{id}/deactivate",
    tag = "Laboratories",
    security(("bearer" = [])),
    params(("id" = u64, Path, description = "Laboratory id")),
    responses(
        (status = 200, description = "Laboratory deactivated", body = LabResponse),
        (status = 403, description = "Forbidden - admin role required"),
        (status = 404, description = "Laboratory not found"),
    )
)]
pub async fn deactivate_lab(
    State(state): State<LabState>,
    AdminOnly(_caller): AdminOnly,
    Path(id): Path<u64>,
) -> Result<Json<LabResponse>, ApiError> {
    Ok(Json(services::labs::set_active(&state.store, id, false)?))
}
