// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::JwksManager;
use crate::state::{AuthState, LabState};
use crate::storage::CredentialStore;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Credential store readability.
    pub store: String,
    /// JWKS (verification keys) status.
    /// Only present when keys are fetched from ms-auth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<String>,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Dependencies the readiness probe looks at.
#[derive(Clone)]
pub struct Readiness {
    store: Arc<CredentialStore>,
    jwks: Option<JwksManager>,
}

impl FromRef<AuthState> for Readiness {
    fn from_ref(state: &AuthState) -> Self {
        Self {
            store: state.store.clone(),
            jwks: None,
        }
    }
}

impl FromRef<LabState> for Readiness {
    fn from_ref(state: &LabState) -> Self {
        Self {
            store: state.store.clone(),
            jwks: state.verifier.jwks().cloned(),
        }
    }
}

fn check_store(store: &CredentialStore) -> String {
    match store.check_health() {
        Ok(()) => "ok".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "store health check failed");
            "unavailable".to_string()
        }
    }
}

/// Check if the remote JWKS is reachable (lab service with `AUTH_JWKS_URL`).
async fn check_jwks(jwks: Option<&JwksManager>) -> Option<String> {
    let jwks = jwks?;
    // Check if we have cached keys
    if jwks.is_cached().await {
        return Some("ok".to_string());
    }
    match jwks.refresh().await {
        Ok(_) => Some("ok".to_string()),
        Err(_) => Some("unavailable".to_string()),
    }
}

/// Health check endpoint handler.
///
/// Returns 200 if all checks pass, 503 if any check fails.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Service is unhealthy", body = ReadyResponse)
    )
)]
pub async fn health(State(probe): State<Readiness>) -> (StatusCode, Json<ReadyResponse>) {
    let store = check_store(&probe.store);
    let jwks = check_jwks(probe.jwks.as_ref()).await;

    let all_ok = store == "ok" && jwks.as_deref().is_none_or(|s| s == "ok");

    let response = ReadyResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            store,
            jwks,
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
/// Does not check dependencies - use `/health` for that.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
