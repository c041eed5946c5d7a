//! Authentication Middleware
//! Mission: Gate protected routes on a valid bearer token and, where asked, a role

use crate::auth::{error::AuthError, jwt::JwtHandler, models::Claims};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;
use tracing::warn;

/// Auth middleware that validates JWT access tokens
pub async fn auth_middleware(
    State(jwt_handler): State<Arc<JwtHandler>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AuthError::NoToken)?;

    let claims = jwt_handler.verify_access_token(bearer.token()).map_err(|e| {
        warn!(path = %req.uri().path(), "Rejected access token: {}", e);
        AuthError::InvalidToken
    })?;

    // Add claims to request extensions so handlers can access them
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Role a route layer demands of the authenticated caller
#[derive(Debug, Clone)]
pub struct RequiredRole(pub String);

impl RequiredRole {
    pub fn new(role: impl Into<String>) -> Self {
        Self(role.into())
    }
}

/// Role middleware; must run after [`auth_middleware`].
///
/// Exact single-role match, no hierarchy.
pub async fn require_role(
    State(RequiredRole(required)): State<RequiredRole>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    match extract_claims(&req) {
        Some(claims) if claims.role == required => Ok(next.run(req).await),
        Some(claims) => {
            warn!(
                "Account {} with role {} denied {} (requires {})",
                claims.user_id,
                claims.role,
                req.uri().path(),
                required
            );
            Err(AuthError::Forbidden)
        }
        None => Err(AuthError::Forbidden),
    }
}

/// Extract claims from request (use after auth middleware)
pub fn extract_claims(req: &Request) -> Option<&Claims> {
    req.extensions().get::<Claims>()
}
