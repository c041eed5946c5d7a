//! JWT Token Handler
//! Mission: Issue and validate access and refresh tokens with separate secrets

use crate::auth::models::Claims;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind as JwtErrorKind, Algorithm, DecodingKey, EncodingKey,
    Header, Validation,
};
use thiserror::Error;
use tracing::debug;

/// Default access token lifetime (1 hour)
pub const DEFAULT_ACCESS_TTL_SECS: u64 = 3600;
/// Default refresh token lifetime (7 days)
pub const DEFAULT_REFRESH_TTL_SECS: u64 = 7 * 24 * 3600;

/// Which secret a token is signed with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Token verification failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature does not match")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed: {0}")]
    Malformed(String),
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// JWT Handler for token operations
pub struct JwtHandler {
    access: SigningKeys,
    refresh: SigningKeys,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtHandler {
    /// Create a handler with HS256 and the default lifetimes
    pub fn new(access_secret: &str, refresh_secret: &str) -> Self {
        Self {
            access: SigningKeys::from_secret(access_secret),
            refresh: SigningKeys::from_secret(refresh_secret),
            algorithm: Algorithm::HS256,
            access_ttl: Duration::seconds(DEFAULT_ACCESS_TTL_SECS as i64),
            refresh_ttl: Duration::seconds(DEFAULT_REFRESH_TTL_SECS as i64),
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Generate an access token for an account
    pub fn issue_access_token(&self, account_id: &str, role: &str) -> Result<String> {
        self.issue_access_token_at(account_id, role, Utc::now())
    }

    pub fn issue_access_token_at(
        &self,
        account_id: &str,
        role: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String> {
        self.issue(TokenKind::Access, account_id, role, issued_at)
    }

    /// Generate a refresh token for an account
    pub fn issue_refresh_token(&self, account_id: &str, role: &str) -> Result<String> {
        self.issue_refresh_token_at(account_id, role, Utc::now())
    }

    pub fn issue_refresh_token_at(
        &self,
        account_id: &str,
        role: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String> {
        self.issue(TokenKind::Refresh, account_id, role, issued_at)
    }

    fn issue(
        &self,
        kind: TokenKind,
        account_id: &str,
        role: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String> {
        let (keys, ttl) = match kind {
            TokenKind::Access => (&self.access, self.access_ttl),
            TokenKind::Refresh => (&self.refresh, self.refresh_ttl),
        };

        let expiration = issued_at
            .checked_add_signed(ttl)
            .context("Invalid timestamp")?;

        let claims = Claims {
            user_id: account_id.to_string(),
            role: role.to_string(),
            iat: issued_at.timestamp(),
            exp: expiration.timestamp(),
        };

        debug!(
            "Generating {} JWT for account {} ({}), expires in {}s",
            kind.as_str(),
            account_id,
            role,
            ttl.num_seconds()
        );

        encode(&Header::new(self.algorithm), &claims, &keys.encoding)
            .context("Failed to generate JWT")
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token, TokenKind::Access)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token, TokenKind::Refresh)
    }

    /// Validate a token against the secret for `kind` and extract its claims
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let keys = match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        };

        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;

        let decoded = decode::<Claims>(token, &keys.decoding, &validation).map_err(|e| {
            match e.kind() {
                JwtErrorKind::ExpiredSignature => TokenError::Expired,
                JwtErrorKind::InvalidSignature => TokenError::InvalidSignature,
                other => TokenError::Malformed(format!("{:?}", other)),
            }
        })?;

        debug!(
            "Validated {} JWT for account {}",
            kind.as_str(),
            decoded.claims.user_id
        );

        Ok(decoded.claims)
    }
}
