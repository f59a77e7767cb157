// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use labsuite::{
    api::lab_router,
    config::LabServiceConfig,
    state::LabState,
    storage::CredentialStore,
    shutdown::shutdown_signal,
    telemetry::init_tracing,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = LabServiceConfig::from_env()?;
    let verifier = config.verifier()?;
    match verifier.jwks() {
        Some(jwks) => {
            tracing::info!(jwks_url = %jwks.jwks_url(), "verifying tokens against remote JWKS")
        }
        None => tracing::info!("verifying tokens against configured public key"),
    }

    let db_path = config.server.data_dir.join("lab.redb");
    let store = CredentialStore::open(&db_path)?;
    tracing::info!(path = %db_path.display(), "lab store opened");

    let app = lab_router(
        LabState::new(store, verifier),
        &config.server.cors_allowed_origins,
    );

    let addr = config.server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "ms-lab listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("ms-lab stopped");
    Ok(())
}
