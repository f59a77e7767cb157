// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use labsuite::{
    api::auth_router,
    config::AuthServiceConfig,
    services::users::seed_admin,
    state::AuthState,
    storage::CredentialStore,
    shutdown::shutdown_signal,
    telemetry::init_tracing,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AuthServiceConfig::from_env()?;
    // Bad or mismatched keys abort here, before anything is bound.
    let keys = config.key_material()?;

    let db_path = config.server.data_dir.join("auth.redb");
    let store = CredentialStore::open(&db_path)?;
    tracing::info!(path = %db_path.display(), "credential store opened");

    if let Some(seed) = &config.seed_admin {
        if seed_admin(&store, &seed.username, &seed.password, &seed.email)? {
            tracing::info!(username = %seed.username, "seeded bootstrap admin");
        }
    }

    let state = AuthState::new(
        store,
        keys,
        config.issuer.clone(),
        config.expiration_minutes,
    );
    let app = auth_router(state.clone(), &config.server.cors_allowed_origins);

    let addr = config.server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, issuer = %state.issuer.issuer(), "ms-auth listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("ms-auth stopped");
    Ok(())
}
