// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Domain Services
//!
//! Business logic shared by the HTTP handlers of both services. Functions
//! take the [`CredentialStore`](crate::storage::CredentialStore) they act on
//! and return [`ServiceError`] on failure; the API layer turns those into
//! HTTP responses.
//!
//! - [`auth`]: login (`ms-auth`)
//! - [`users`]: user and role administration (`ms-auth`)
//! - [`labs`]: laboratory registry (`ms-lab`)
//! - [`orders`]: order workflow and lab-scoped reads (`ms-lab`)

pub mod auth;
pub mod error;
pub mod labs;
pub mod orders;
pub mod users;
pub mod validation;

pub use error::{ServiceError, ServiceResult};
