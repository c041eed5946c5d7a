//! Authentication API Endpoints
//! Mission: Signup, login and refresh, plus the caller's own profile

use crate::auth::{
    error::AuthError,
    jwt::JwtHandler,
    models::{
        AccountResponse, Claims, LoginRequest, LoginResponse, NewAccount, RefreshRequest,
        RefreshResponse, SignupRequest, UserResponse, ROLE_USER,
    },
    password::PasswordHasher,
    user_store::CredentialStore,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub user_store: Arc<dyn CredentialStore>,
    pub jwt_handler: Arc<JwtHandler>,
    pub password_hasher: Arc<PasswordHasher>,
}

impl AuthState {
    pub fn new(
        user_store: Arc<dyn CredentialStore>,
        jwt_handler: Arc<JwtHandler>,
        password_hasher: Arc<PasswordHasher>,
    ) -> Self {
        Self {
            user_store,
            jwt_handler,
            password_hasher,
        }
    }
}

/// Unwrap a JSON body, folding extractor rejections into a validation error
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AuthError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        debug!("Rejected request body: {}", rejection.body_text());
        AuthError::MalformedBody
    })
}

/// Signup endpoint - POST /signup
pub async fn signup(
    State(state): State<AuthState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AuthError> {
    let input = json_body(payload)?.validate()?;

    if state.user_store.find_by_email(&input.email).await?.is_some() {
        warn!("❌ Signup rejected, email already registered: {}", input.email);
        return Err(AuthError::DuplicateEmail);
    }

    let password_hash = state.password_hasher.hash(input.password).await?;

    // The store's uniqueness constraint settles a race the lookup above missed.
    let account = state
        .user_store
        .create(NewAccount {
            name: input.name,
            email: input.email,
            password_hash,
            role: ROLE_USER.to_string(),
        })
        .await?;

    info!("✅ Signup successful: {} ({})", account.email, account.id);

    Ok(Json(UserResponse {
        user: AccountResponse::from_account(&account),
    }))
}

/// Login endpoint - POST /login
pub async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthError> {
    let input = json_body(payload)?.validate()?;

    info!("🔐 Login attempt: {}", input.email);

    let account = state.user_store.find_by_email(&input.email).await?;

    // Unknown email and wrong password take the same path and the same time.
    let (valid, account) = match account {
        Some(account) => {
            let valid = state
                .password_hasher
                .verify(input.password, account.password_hash.clone())
                .await?;
            (valid, Some(account))
        }
        None => (
            state.password_hasher.verify_dummy(input.password).await?,
            None,
        ),
    };

    let account = match account {
        Some(account) if valid => account,
        _ => {
            warn!("❌ Failed login attempt: {}", input.email);
            return Err(AuthError::InvalidCredentials);
        }
    };

    let token = state
        .jwt_handler
        .issue_access_token(&account.id.to_string(), &account.role)?;

    info!("✅ Login successful: {} ({})", account.email, account.role);

    Ok(Json(LoginResponse { token }))
}

/// Refresh endpoint - POST /refresh
///
/// Trusts the refresh token's claims as-is; the credential store is not consulted.
pub async fn refresh(
    State(state): State<AuthState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>, AuthError> {
    // A body that cannot be read carries no token.
    let refresh_token = payload
        .map(|Json(body)| body)
        .unwrap_or_else(|rejection| {
            debug!("Unreadable refresh body: {}", rejection.body_text());
            RefreshRequest::default()
        })
        .validate()?;

    let claims = state
        .jwt_handler
        .verify_refresh_token(&refresh_token)
        .map_err(|e| {
            warn!("❌ Refresh rejected: {}", e);
            AuthError::InvalidRefreshToken
        })?;

    let access_token = state
        .jwt_handler
        .issue_access_token(&claims.user_id, &claims.role)?;

    info!("🔄 Access token refreshed for account {}", claims.user_id);

    Ok(Json(RefreshResponse { access_token }))
}

/// Get current account - GET /me
pub async fn get_current_user(
    State(state): State<AuthState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserResponse>, AuthError> {
    let id = Uuid::parse_str(&claims.user_id).map_err(|_| AuthError::InvalidToken)?;

    let account = state
        .user_store
        .find_by_id(&id)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    Ok(Json(UserResponse {
        user: AccountResponse::from_account(&account),
    }))
}

/// List all accounts - GET /users (Admin only, enforced by the role layer)
pub async fn list_users(
    State(state): State<AuthState>,
) -> Result<Json<Vec<AccountResponse>>, AuthError> {
    let accounts = state.user_store.list().await?;
    Ok(Json(
        accounts.iter().map(AccountResponse::from_account).collect(),
    ))
}
