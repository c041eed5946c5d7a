use axum::{
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::auth::{
    api as auth_api, auth_middleware, models::ROLE_ADMIN, require_role, AuthState, RequiredRole,
};
use crate::middleware::{rate_limit_middleware, request_logging, RateLimiter};

/// Create the API router
pub fn create_router(auth_state: AuthState, limiter: RateLimiter) -> Router {
    // Public auth endpoints, rate limited per client
    let auth_routes = Router::new()
        .route("/signup", post(auth_api::signup))
        .route("/login", post(auth_api::login))
        .route("/refresh", post(auth_api::refresh))
        .route_layer(middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ));

    let admin_routes = Router::new()
        .route("/users", get(auth_api::list_users))
        .route_layer(middleware::from_fn_with_state(
            RequiredRole::new(ROLE_ADMIN),
            require_role,
        ));

    // Token check wraps the role check, so it runs first
    let protected_routes = Router::new()
        .route("/me", get(auth_api::get_current_user))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(
            auth_state.jwt_handler.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes)
        .merge(protected_routes)
        .with_state(auth_state)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}

// ===== Route Handlers =====

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}
