//! Inventory Backend - authentication server and operator tooling
//!
//! Usage:
//!   cargo run --release -- serve
//!   cargo run --release -- issue-refresh-token --email ops@example.com
//!   cargo run --release -- grant-role --email ops@example.com --role admin

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use inventory_backend::{
    auth::{AuthState, CredentialStore, UserStore},
    config::ServerConfig,
    create_router,
    middleware::{RateLimitConfig, RateLimiter},
};
use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Inventory authentication server
#[derive(Parser, Debug)]
#[command(name = "inventory")]
#[command(about = "Authentication API for the inventory dashboard")]
struct Cli {
    #[command(flatten)]
    config: ServerConfig,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Print a refresh token for an existing account
    IssueRefreshToken {
        /// Email of the account
        #[arg(short, long)]
        email: String,
    },

    /// Assign a pre-existing role to an account
    GrantRole {
        /// Email of the account
        #[arg(short, long)]
        email: String,

        /// Role name, e.g. "admin"
        #[arg(short, long)]
        role: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    load_env();
    init_tracing();

    let cli = Cli::parse();
    cli.config.auth.validate()?;
    cli.config.rate_limit.validate()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(cli.config).await,
        Commands::IssueRefreshToken { email } => issue_refresh_token(&cli.config, &email).await,
        Commands::GrantRole { email, role } => grant_role(&cli.config, &email, &role).await,
    }
}

async fn serve(config: ServerConfig) -> Result<()> {
    info!("🚀 Inventory auth server starting");

    let user_store: Arc<dyn CredentialStore> = Arc::new(UserStore::new(&config.db_path)?);
    let jwt_handler = Arc::new(config.auth.jwt_handler()?);
    let password_hasher = Arc::new(config.auth.password_hasher()?);
    let auth_state = AuthState::new(user_store, jwt_handler, password_hasher);

    info!(
        "🔐 Authentication initialized (db: {}, access ttl: {}s)",
        config.db_path, config.auth.access_ttl_secs
    );

    let limiter = RateLimiter::new(RateLimitConfig::from(&config.rate_limit));
    spawn_rate_limit_cleanup(limiter.clone());

    let app = create_router(auth_state, limiter);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("🎯 API server listening on {}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("👋 Server stopped");
    Ok(())
}

async fn issue_refresh_token(config: &ServerConfig, email: &str) -> Result<()> {
    let store = UserStore::new(&config.db_path)?;
    let account = store
        .find_by_email(email)
        .await?
        .with_context(|| format!("No account with email {}", email))?;

    let token = config
        .auth
        .jwt_handler()?
        .issue_refresh_token(&account.id.to_string(), &account.role)?;

    info!("🔑 Issued refresh token for {} ({})", account.email, account.role);
    println!("{}", token);
    Ok(())
}

async fn grant_role(config: &ServerConfig, email: &str, role: &str) -> Result<()> {
    let store = UserStore::new(&config.db_path)?;
    let account = store
        .find_by_email(email)
        .await?
        .with_context(|| format!("No account with email {}", email))?;

    let updated = store.assign_role(&account.id, role).await?;
    println!("{} now has role {}", updated.email, updated.role);
    Ok(())
}

fn spawn_rate_limit_cleanup(limiter: RateLimiter) {
    let period = limiter.config().window.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            limiter.cleanup();
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Initialize tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inventory_backend=debug,inventory=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // 2) Also try the crate root .env when run from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
