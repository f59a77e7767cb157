// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! RS256 access tokens issued by `ms-auth` and trusted by both services.
//!
//! ## Auth Flow
//!
//! 1. Client posts credentials to `POST /auth/login` on `ms-auth`
//! 2. `ms-auth` checks the Argon2 hash and signs a token with its private key
//! 3. Client sends `Authorization: Bearer <token>` to either service
//! 4. The authentication gate verifies the token and attaches an
//!    [`AuthenticatedUser`] to the request:
//!    - `sub` → username
//!    - `userId` → external id of the user
//!    - `roles` → typed [`Role`] set
//!    - `labCode` → lab scope of a LAB_TECH
//! 5. Route extractors turn a missing principal into 401 and a missing role
//!    into 403
//!
//! ## Security
//!
//! - Keys are loaded and cross-checked at startup; a bad key aborts the process
//! - Verification failures of any kind collapse to "anonymous"
//! - No clock skew tolerance unless configured
//! - `ms-lab` may fetch the public key from the `ms-auth` JWKS endpoint

pub mod claims;
pub mod error;
pub mod extractor;
pub mod issuer;
pub mod jwks;
pub mod keys;
pub mod middleware;
pub mod password;
pub mod roles;
pub mod verifier;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::{AdminOnly, AdminOrLabTech, Auth};
pub use issuer::{IssuedToken, TokenIssuer, TokenSubject};
pub use jwks::JwksManager;
pub use keys::{KeyError, KeyMaterial, PublicKeyMaterial};
pub use roles::Role;
pub use verifier::{KeySource, TokenVerifier};
