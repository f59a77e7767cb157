// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of both services. All types derive
//! `Serialize`/`Deserialize` and `ToSchema` for JSON handling and OpenAPI
//! documentation. Field names are camelCase on the wire.
//!
//! ## Model Categories
//!
//! - **Auth**: login request/response, JWKS document
//! - **Users & Roles**: user management on `ms-auth`
//! - **Laboratories**: lab registry on `ms-lab`
//! - **Orders**: order workflow on `ms-lab`
//! - **Paging**: page query and page response wrapper

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::Role;

/// Default page size.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u32 = 100;

// =============================================================================
// Auth Models
// =============================================================================

/// Credentials for `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Signed RS256 access token
    pub token: String,
    /// Instant the token stops being accepted
    pub expires_at: DateTime<Utc>,
    /// External id of the user
    pub user_id: Uuid,
    pub username: String,
    /// Role names, sorted
    pub roles: Vec<String>,
    /// Present only for LAB_TECH users
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lab_code: Option<String>,
}

// =============================================================================
// User & Role Models
// =============================================================================

/// Request to create a user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Required when `roles` contains `LAB_TECH`
    #[serde(default)]
    pub lab_code: Option<String>,
    /// Role names (case-insensitive)
    #[serde(default)]
    pub roles: Vec<String>,
    /// Whether the account may log in
    pub active: Option<bool>,
}

/// Partial update of a user. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub lab_code: Option<String>,
    pub roles: Option<Vec<String>>,
    pub active: Option<bool>,
}

/// User as returned by the API. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: u64,
    pub external_id: Uuid,
    pub username: String,
    pub email: String,
    pub lab_code: Option<String>,
    pub active: bool,
    /// Role names, sorted
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reference role.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleResponse {
    pub id: u64,
    pub name: Role,
    pub description: String,
}

// =============================================================================
// Laboratory Models
// =============================================================================

/// Request to register a laboratory.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLabRequest {
    /// Unique code, `[A-Z0-9_]{3,50}`
    pub code: String,
    /// Unique display name
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub supported_tests: Option<Vec<String>>,
}

/// Partial update of a laboratory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLabRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub supported_tests: Option<Vec<String>>,
    pub active: Option<bool>,
}

/// Laboratory as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabResponse {
    pub id: u64,
    pub external_id: Uuid,
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub active: bool,
    pub supported_tests: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query for `GET /labs`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LabListQuery {
    /// Only labs with this active flag
    pub active: Option<bool>,
    /// Zero-based page index
    pub page: Option<u32>,
    /// Page size (max 100)
    pub size: Option<u32>,
}

// =============================================================================
// Order Models
// =============================================================================

/// Order workflow state.
///
/// `CREATED → ASSIGNED → IN_PROGRESS → FINISHED`, with re-assignment allowed
/// from any state but `FINISHED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Assigned,
    InProgress,
    Finished,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Assigned => "ASSIGNED",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::Finished => "FINISHED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to create an order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub patient_id: String,
    pub requested_test: String,
    /// Assign immediately to this lab; blank is treated as absent
    #[serde(default)]
    pub lab_code: Option<String>,
}

/// Request to (re-)assign an order to a lab.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignOrderRequest {
    pub lab_code: String,
}

/// Laboratory reference embedded in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LabSummary {
    pub id: u64,
    pub code: String,
    pub name: String,
}

/// Order as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: u64,
    pub external_id: Uuid,
    pub patient_id: String,
    pub requested_test: String,
    pub status: OrderStatus,
    pub lab: Option<LabSummary>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query for `GET /orders`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    /// Ignored for LAB_TECH callers, who always see their own lab
    pub lab_code: Option<String>,
    pub patient_id: Option<String>,
    /// Zero-based page index
    pub page: Option<u32>,
    /// Page size (max 100)
    pub size: Option<u32>,
}

// =============================================================================
// Paging
// =============================================================================

/// Resolved page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    /// Apply defaults and clamp the size to `1..=MAX_PAGE_SIZE`.
    pub fn new(page: Option<u32>, size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(0),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub first: bool,
    pub last: bool,
}

impl<T> PageResponse<T> {
    /// Cut one page out of the full, already ordered result set.
    pub fn from_items(items: Vec<T>, request: PageRequest) -> Self {
        let total = items.len();
        let size = request.size as usize;
        let total_pages = total.div_ceil(size);
        let start = (request.page as usize).saturating_mul(size).min(total);

        let content: Vec<T> = items.into_iter().skip(start).take(size).collect();

        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements: total as u64,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
            first: request.page == 0,
            last: (request.page as usize) + 1 >= total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResponse<U> {
        PageResponse {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            first: self.first,
            last: self.last,
        }
    }
}
