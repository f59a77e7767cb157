// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LabSuite - laboratory order services
//!
//! Two HTTP services built from this crate:
//!
//! - `ms-auth` manages users and roles and issues RS256 access tokens
//! - `ms-lab` manages laboratories and drives clinical orders through
//!   `CREATED → ASSIGNED → IN_PROGRESS → FINISHED`
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers and routers (Axum)
//! - `auth` - Token issuance, verification and route guards
//! - `lifecycle` - Order state machine and lab visibility scope
//! - `services` - Validation and business rules behind each endpoint
//! - `storage` - Embedded redb store

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod services;
pub mod shutdown;
pub mod state;
pub mod storage;
pub mod telemetry;
