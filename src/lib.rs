//! Inventory Backend Library
//!
//! Authentication service for the inventory app: account signup, login,
//! token refresh, and bearer/role gating of protected routes.

pub mod api;
pub mod auth;
pub mod config;
pub mod middleware;

pub use api::create_router;
pub use config::{AuthConfig, ServerConfig};
