// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access token verification.
//!
//! ## Gates
//!
//! 1. Compact structure parses (header, claims, signature)
//! 2. Header `typ` is exactly `JWT`
//! 3. RS256 signature verifies against the configured key
//! 4. `iss` equals the expected issuer, when one is configured
//! 5. `exp` is present and strictly in the future (plus configured leeway)
//!
//! Every failure collapses to `None`. Callers decide whether an absent
//! principal means 401 or anonymous access.

use chrono::Utc;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

use super::claims::VerifiedClaims;
use super::jwks::JwksManager;
use super::keys::PublicKeyMaterial;

/// Required value of the header `typ` field.
const TOKEN_TYPE: &str = "JWT";

/// Where the verifier gets its public key from.
#[derive(Clone)]
pub enum KeySource {
    /// Locally configured PEM
    Static(PublicKeyMaterial),
    /// Remote JWKS endpoint, keys selected by `kid`
    Jwks(JwksManager),
}

/// Validates bearer tokens and extracts their claims.
#[derive(Clone)]
pub struct TokenVerifier {
    source: KeySource,
    issuer: Option<String>,
    leeway_seconds: u64,
}

impl TokenVerifier {
    pub fn new(source: KeySource) -> Self {
        Self {
            source,
            issuer: None,
            leeway_seconds: 0,
        }
    }

    /// Require tokens to carry exactly this issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Tolerated clock skew for `exp`.
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    /// The remote key endpoint, when keys come from JWKS.
    pub fn jwks(&self) -> Option<&JwksManager> {
        match &self.source {
            KeySource::Jwks(jwks) => Some(jwks),
            KeySource::Static(_) => None,
        }
    }

    /// Verify a compact token. Any failure yields `None`.
    pub async fn verify(&self, token: &str) -> Option<VerifiedClaims> {
        let header = match decode_header(token) {
            Ok(header) => header,
            Err(e) => {
                tracing::debug!(error = %e, "rejecting malformed token");
                return None;
            }
        };

        if header.typ.as_deref() != Some(TOKEN_TYPE) {
            tracing::debug!(typ = ?header.typ, "rejecting token with unexpected type");
            return None;
        }

        let key = self.decoding_key(header.kid.as_deref()).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = self.leeway_seconds;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let claims = match decode::<VerifiedClaims>(token, &key, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!(error = %e, "rejecting token");
                return None;
            }
        };

        // jsonwebtoken accepts exp == now; require it to be strictly later.
        let leeway = i64::try_from(self.leeway_seconds).unwrap_or(i64::MAX);
        if claims.exp.saturating_add(leeway) <= Utc::now().timestamp() {
            tracing::debug!(exp = claims.exp, "rejecting expired token");
            return None;
        }

        Some(claims)
    }

    async fn decoding_key(&self, kid: Option<&str>) -> Option<DecodingKey> {
        match &self.source {
            KeySource::Static(public) => Some(public.decoding_key().clone()),
            KeySource::Jwks(jwks) => {
                let result = match kid {
                    Some(kid) => jwks.get_decoding_key(kid).await,
                    None => jwks.get_any_decoding_key().await,
                };
                result
                    .map_err(|e| tracing::warn!(error = %e, "verification key unavailable"))
                    .ok()
            }
        }
    }
}
