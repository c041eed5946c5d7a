//! Application configuration.
//!
//! Every setting is a CLI flag with an environment fallback, read once at
//! startup and handed down explicitly; nothing below `main` reads the
//! environment.

use anyhow::{bail, Context, Result};
use chrono::Duration;
use clap::Args;
use jsonwebtoken::Algorithm;
use std::{net::SocketAddr, str::FromStr};

use crate::auth::{jwt::JwtHandler, password::PasswordHasher};
use crate::middleware::RateLimitConfig;

/// Longest token lifetime accepted (ten years)
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Longest rate-limit window accepted (one day)
pub const MAX_RATE_LIMIT_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Server-wide settings
#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind_addr: SocketAddr,

    /// Path to the SQLite credential database
    #[arg(long, env = "AUTH_DB_PATH", default_value = "inventory_auth.db")]
    pub db_path: String,

    #[command(flatten)]
    pub auth: AuthConfig,

    #[command(flatten)]
    pub rate_limit: RateLimitArgs,
}

/// Token and password settings
#[derive(Clone, Args)]
pub struct AuthConfig {
    /// Secret used to sign access tokens
    #[arg(long, env = "JWT_SECRET_KEY", hide_env_values = true)]
    pub jwt_secret: String,

    /// Secret used to sign refresh tokens (must differ from the access secret)
    #[arg(long, env = "JWT_REFRESH_SECRET", hide_env_values = true)]
    pub refresh_secret: String,

    /// HMAC signature scheme: HS256, HS384 or HS512
    #[arg(long, env = "JWT_ALGORITHM", default_value = "HS256")]
    pub jwt_algorithm: String,

    /// Access token lifetime in seconds
    #[arg(long, env = "ACCESS_TOKEN_TTL_SECS", default_value_t = 3600)]
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, env = "REFRESH_TOKEN_TTL_SECS", default_value_t = 604_800)]
    pub refresh_ttl_secs: u64,

    /// bcrypt work factor
    #[arg(long, env = "BCRYPT_COST", default_value_t = 10)]
    pub bcrypt_cost: u32,
}

// Secrets stay out of logs and panics.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

impl AuthConfig {
    /// Reject settings the server must not start with
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.is_empty() || self.refresh_secret.is_empty() {
            bail!("JWT_SECRET_KEY and JWT_REFRESH_SECRET must both be set");
        }
        if self.jwt_secret == self.refresh_secret {
            bail!("JWT_SECRET_KEY and JWT_REFRESH_SECRET must differ");
        }
        self.algorithm()?;
        for (name, ttl) in [
            ("ACCESS_TOKEN_TTL_SECS", self.access_ttl_secs),
            ("REFRESH_TOKEN_TTL_SECS", self.refresh_ttl_secs),
        ] {
            if !(1..=MAX_TOKEN_TTL_SECS).contains(&ttl) {
                bail!("{name} must be between 1 and {MAX_TOKEN_TTL_SECS}, got {ttl}");
            }
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            bail!("BCRYPT_COST must be between 4 and 31, got {}", self.bcrypt_cost);
        }
        Ok(())
    }

    pub fn algorithm(&self) -> Result<Algorithm> {
        let algorithm = Algorithm::from_str(&self.jwt_algorithm)
            .with_context(|| format!("Unknown JWT algorithm {}", self.jwt_algorithm))?;
        match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
            other => bail!("JWT algorithm {:?} is not an HMAC scheme", other),
        }
    }

    pub fn jwt_handler(&self) -> Result<JwtHandler> {
        self.validate()?;
        let access_ttl = i64::try_from(self.access_ttl_secs).context("access ttl out of range")?;
        let refresh_ttl =
            i64::try_from(self.refresh_ttl_secs).context("refresh ttl out of range")?;
        Ok(JwtHandler::new(&self.jwt_secret, &self.refresh_secret)
            .with_algorithm(self.algorithm()?)
            .with_access_ttl(Duration::seconds(access_ttl))
            .with_refresh_ttl(Duration::seconds(refresh_ttl)))
    }

    pub fn password_hasher(&self) -> Result<PasswordHasher> {
        self.validate()?;
        PasswordHasher::new(self.bcrypt_cost)
    }
}

/// Rate limiting for the public auth endpoints
#[derive(Debug, Clone, Args)]
pub struct RateLimitArgs {
    /// Requests allowed per client per window
    #[arg(long, env = "RATE_LIMIT_MAX_REQUESTS", default_value_t = 20)]
    pub rate_limit_max_requests: u32,

    /// Window length in seconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value_t = 60)]
    pub rate_limit_window_secs: u64,

    /// Extra requests tolerated above the limit
    #[arg(long, env = "RATE_LIMIT_BURST", default_value_t = 5)]
    pub rate_limit_burst: u32,
}

impl RateLimitArgs {
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit_max_requests == 0 {
            bail!("RATE_LIMIT_MAX_REQUESTS must be positive");
        }
        if !(1..=MAX_RATE_LIMIT_WINDOW_SECS).contains(&self.rate_limit_window_secs) {
            bail!(
                "RATE_LIMIT_WINDOW_SECS must be between 1 and {MAX_RATE_LIMIT_WINDOW_SECS}, got {}",
                self.rate_limit_window_secs
            );
        }
        Ok(())
    }
}

impl From<&RateLimitArgs> for RateLimitConfig {
    fn from(args: &RateLimitArgs) -> Self {
        Self {
            max_requests: args.rate_limit_max_requests,
            window: std::time::Duration::from_secs(args.rate_limit_window_secs),
            burst: args.rate_limit_burst,
        }
    }
}
