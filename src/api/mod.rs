// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP surface of both services.
//!
//! Each router carries the same layer stack, innermost first:
//!
//! 1. authentication gate (attaches the principal, never rejects)
//! 2. error envelope (adds `path`, wraps non-JSON errors)
//! 3. CORS from the configured origins
//! 4. request id propagation, tracing, request id generation

use std::sync::Arc;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{middleware::authenticate, Auth, AuthError, Role, TokenVerifier},
    error::{error_envelope, ApiError},
    models::{
        AssignOrderRequest, CreateLabRequest, CreateOrderRequest, CreateUserRequest,
        LabResponse, LabSummary, LoginRequest, LoginResponse, OrderResponse,
        OrderStatus, RoleResponse, UpdateLabRequest, UpdateUserRequest, UserResponse,
    },
    state::{AuthState, LabState},
};

pub mod auth;
pub mod health;
pub mod labs;
pub mod orders;
pub mod roles;
pub mod users;

/// Router of `ms-auth`.
pub fn auth_router(state: AuthState, allowed_origins: &[String]) -> Router {
    let routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/auth/login", post(auth::login))
        .route("/.well-known/jwks.json", get(auth::jwks))
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/me", get(users::get_current_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/roles", get(roles::list_roles))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", AuthApiDoc::openapi()))
        .fallback(not_found);

    let verifier = state.verifier.clone();
    with_layers(routes.with_state(state), verifier, allowed_origins)
}

/// Router of `ms-lab`.
pub fn lab_router(state: LabState, allowed_origins: &[String]) -> Router {
    let routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/labs", get(labs::list_labs).post(labs::create_lab))
        .route("/labs/{id}", get(labs::get_lab).put(labs::update_lab))
        .route("/labs/{id}/activate", post(labs::activate_lab))
        .route("/labs/{id}/deactivate", post(labs::deactivate_lab))
        .route("/orders", get(orders::list_orders).post(orders::create_order))
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}/assign", post(orders::assign_order))
        .route("/orders/{id}/start", post(orders::start_order))
        .route("/orders/{id}/finish", post(orders::finish_order))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", LabApiDoc::openapi()))
        .fallback(not_found);

    let verifier = state.verifier.clone();
    with_layers(routes.with_state(state), verifier, allowed_origins)
}

fn with_layers(
    router: Router,
    verifier: Arc<TokenVerifier>,
    allowed_origins: &[String],
) -> Router {
    router
        .layer(middleware::from_fn_with_state(verifier, authenticate))
        .layer(middleware::from_fn(error_envelope))
        .layer(cors(allowed_origins))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// CORS for the configured browser origins.
///
/// Unparseable origins are skipped with a warning.
pub fn cors(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
        .allow_credentials(true)
}

/// Unmatched routes only answer 404 to authenticated callers.
async fn not_found(user: Result<Auth, AuthError>) -> Result<ApiError, AuthError> {
    user.map(|_| ApiError::not_found("No handler found"))
}

/// Registers the `bearer` scheme referenced by protected operations.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "ms-auth", description = "Users, roles and token issuance"),
    paths(
        health::health,
        health::liveness,
        auth::login,
        auth::jwks,
        users::create_user,
        users::update_user,
        users::delete_user,
        users::get_user,
        users::list_users,
        users::get_current_user,
        roles::list_roles
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            LoginRequest,
            LoginResponse,
            CreateUserRequest,
            UpdateUserRequest,
            UserResponse,
            RoleResponse,
            Role
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Auth", description = "Login and key publication"),
        (name = "Users", description = "User administration"),
        (name = "Roles", description = "Role catalog")
    )
)]
struct AuthApiDoc;

#[derive(OpenApi)]
#[openapi(
    info(title = "ms-lab", description = "Laboratories and the order workflow"),
    paths(
        health::health,
        health::liveness,
        labs::create_lab,
        labs::update_lab,
        labs::get_lab,
        labs::list_labs,
        labs::activate_lab,
        labs::deactivate_lab,
        orders::create_order,
        orders::assign_order,
        orders::start_order,
        orders::finish_order,
        orders::get_order,
        orders::list_orders
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            CreateLabRequest,
            UpdateLabRequest,
            LabResponse,
            LabSummary,
            CreateOrderRequest,
            AssignOrderRequest,
            OrderResponse,
            OrderStatus
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Laboratories", description = "Laboratory management"),
        (name = "Orders", description = "Order workflow")
    )
)]
struct LabApiDoc;
