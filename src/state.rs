// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use jsonwebtoken::jwk::JwkSet;

use crate::auth::{KeyMaterial, KeySource, TokenIssuer, TokenVerifier};
use crate::storage::CredentialStore;

/// Shared state of `ms-auth`.
#[derive(Clone)]
pub struct AuthState {
    pub store: Arc<CredentialStore>,
    pub issuer: Arc<TokenIssuer>,
    pub verifier: Arc<TokenVerifier>,
    /// Published at `/.well-known/jwks.json`
    pub jwks: Arc<JwkSet>,
}

impl AuthState {
    /// Wire issuer and verifier to the same keypair.
    pub fn new(
        store: CredentialStore,
        keys: KeyMaterial,
        issuer: impl Into<String>,
        ttl_minutes: u32,
    ) -> Self {
        let issuer = issuer.into();
        let keys = Arc::new(keys);
        let verifier = TokenVerifier::new(KeySource::Static(keys.public().clone()))
            .with_issuer(issuer.clone());

        Self {
            store: Arc::new(store),
            jwks: Arc::new(JwkSet {
                keys: vec![keys.public().jwk().clone()],
            }),
            issuer: Arc::new(TokenIssuer::new(keys, issuer, ttl_minutes)),
            verifier: Arc::new(verifier),
        }
    }
}

/// Shared state of `ms-lab`.
#[derive(Clone)]
pub struct LabState {
    pub store: Arc<CredentialStore>,
    pub verifier: Arc<TokenVerifier>,
}

impl LabState {
    pub fn new(store: CredentialStore, verifier: TokenVerifier) -> Self {
        Self {
            store: Arc::new(store),
            verifier: Arc::new(verifier),
        }
    }
}
