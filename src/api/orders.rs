// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Order endpoints.
//!
//! Writes are admin-only. Reads are open to lab technicians, who only ever
//! see orders of their own laboratory.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::auth::{AdminOnly, AdminOrLabTech};
use crate::error::ApiError;
use crate::models::{
    AssignOrderRequest, CreateOrderRequest, OrderListQuery, OrderResponse, PageResponse,
};
use crate::services;
use crate::state::LabState;

/// Create an order, optionally assigned to a lab right away.
#[utoipa::path(
    post,
    path = "/orders",
    tag = "Orders",
    security(("bearer" = [])),
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created", body = OrderResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Forbidden - admin role required"),
        (status = 404, description = "Lab code does not exist"),
    )
)]
pub async fn create_order(
    State(state): State<LabState>,
    AdminOnly(_caller): AdminOnly,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = services::orders::create(&state.store, request)?;
    Ok((StatusCode::OK, Json(order)))
}

#[utoipa::path(
    post,
    path = "/orders/{id}/assign",
    tag = "Orders",
    security(("bearer" = [])),
    params(("id" = u64, Path, description = "Order id")),
    request_body = AssignOrderRequest,
    responses(
        (status = 200, description = "Order assigned", body = OrderResponse),
        (status = 400, description = "Order is FINISHED or labCode blank"),
        (status = 403, description = "Forbidden - admin role required"),
        (status = 404, description = "Order or lab not found"),
    )
)]
pub async fn assign_order(
    State(state): State<LabState>,
    AdminOnly(_caller): AdminOnly,
    Path(id): Path<u64>,
    Json(request): Json<AssignOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    Ok(Json(services::orders::assign(&state.store, id, request)?))
}

#[utoipa::path(
    post,
    path = "/orders/{id}/start",
    tag = "Orders",
    security(("bearer" = [])),
    params(("id" = u64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order in progress", body = OrderResponse),
        (status = 400, description = "Order is not ASSIGNED"),
        (status = 403, description = "Forbidden - admin role required"),
        (status = 404, description = "Order not found"),
    )
)]
pub async fn start_order(
    State(state): State<LabState>,
    AdminOnly(_caller): AdminOnly,
    Path(id): Path<u64>,
) -> Result<Json<OrderResponse>, ApiError> {
    Ok(Json(services::orders::start(&state.store, id)?))
}

#[utoipa::path(
    post,
    path = "/orders/{id}/finish",
    tag = "Orders",
    security(("bearer" = [])),
    params(("id" = u64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order finished", body = OrderResponse),
        (status = 400, description = "Order is not IN_PROGRESS"),
        (status = 403, description = "Forbidden - admin role required"),
        (status = 404, description = "Order not found"),
    )
)]
pub async fn finish_order(
    State(state): State<LabState>,
    AdminOnly(_caller): AdminOnly,
    Path(id): Path<u64>,
) -> Result<Json<OrderResponse>, ApiError> {
    Ok(Json(services::orders::finish(&state.store, id)?))
}

/// Fetch one order.
///
/// A lab technician asking for another lab's order gets 403, not 404.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    tag = "Orders",
    security(("bearer" = [])),
    params(("id" = u64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order", body = OrderResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Order belongs to another lab"),
        (status = 404, description = "Order not found"),
    )
)]
pub async fn get_order(
    State(state): State<LabState>,
    AdminOrLabTech(user): AdminOrLabTech,
    Path(id): Path<u64>,
) -> Result<Json<OrderResponse>, ApiError> {
    Ok(Json(services::orders::get(&state.store, &user, id)?))
}

/// Paged order list. For lab technicians `labCode` is forced to their own lab.
#[utoipa::path(
    get,
    path = "/orders",
    tag = "Orders",
    security(("bearer" = [])),
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders", body = PageResponse<OrderResponse>),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Lab technician without a lab"),
    )
)]
pub async fn list_orders(
    State(state): State<LabState>,
    AdminOrLabTech(user): AdminOrLabTech,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<PageResponse<OrderResponse>>, ApiError> {
    Ok(Json(services::orders::list(&state.store, &user, &query)?))
}
