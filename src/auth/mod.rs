//! Authentication Module
//! Mission: Accounts, JWT issuance and refresh, bearer-token and role gating

pub mod api;
pub mod error;
pub mod jwt;
pub mod memory_store;
pub mod middleware;
pub mod models;
pub mod password;
pub mod user_store;

pub use api::AuthState;
pub use error::{AuthError, ErrorKind};
pub use jwt::{JwtHandler, TokenError, TokenKind};
pub use memory_store::InMemoryUserStore;
pub use middleware::{auth_middleware, require_role, RequiredRole};
pub use password::PasswordHasher;
pub use user_store::{CredentialStore, StoreError, UserStore};
