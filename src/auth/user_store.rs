//! User Storage
//! Mission: Persist accounts and roles, with the database enforcing email uniqueness

use crate::auth::models::{Account, NewAccount, SEEDED_ROLES};
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// How long a connection waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Credential store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("an account with email {0} already exists")]
    DuplicateEmail(String),
    #[error("role {0} does not exist")]
    UnknownRole(String),
    #[error("account {0} not found")]
    AccountNotFound(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Account persistence used by the auth endpoints.
///
/// `create` must reject a second account with the same email atomically,
/// even when two signups race.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Account>, StoreError>;

    async fn create(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn list(&self) -> Result<Vec<Account>, StoreError>;

    /// Point an account at another pre-existing role
    async fn assign_role(&self, id: &Uuid, role: &str) -> Result<Account, StoreError>;
}

/// User storage with SQLite backend
pub struct UserStore {
    db_path: String,
}

const ACCOUNT_COLUMNS: &str = "u.id, u.name, u.email, u.password_hash, r.name, u.created_at
     FROM users u JOIN roles r ON r.id = u.role_id";

impl UserStore {
    /// Create a new user store and initialize database
    pub fn new(db_path: &str) -> anyhow::Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        info!("🔐 Credential store ready at {}", db_path);
        Ok(store)
    }

    fn open(db_path: &str) -> rusqlite::Result<Connection> {
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Initialize database schema
    fn init_db(&self) -> anyhow::Result<()> {
        let conn = Self::open(&self.db_path).context("Failed to open credential database")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS roles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL
            );
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role_id INTEGER NOT NULL REFERENCES roles(id),
                created_at TEXT NOT NULL
            );",
        )
        .context("Failed to create credential schema")?;

        for role in SEEDED_ROLES {
            conn.execute(
                "INSERT OR IGNORE INTO roles (name) VALUES (?1)",
                params![role],
            )
            .context("Failed to seed roles")?;
        }

        Ok(())
    }

    /// Run `f` with a fresh connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Self::open(&db_path).context("Failed to open credential database")?;
            f(&conn)
        })
        .await
        .context("Credential store task failed")?
    }

    fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
        let id: String = row.get(0)?;
        let id = Uuid::parse_str(&id).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Account {
            id,
            name: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            role: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn query_one(
        conn: &Connection,
        filter: &str,
        value: &str,
    ) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {} WHERE {} = ?1", ACCOUNT_COLUMNS, filter);
        conn.query_row(&sql, params![value], Self::account_from_row)
            .optional()
            .context("Failed to query account")
            .map_err(StoreError::from)
    }

    fn role_id(conn: &Connection, role: &str) -> Result<i64, StoreError> {
        conn.query_row(
            "SELECT id FROM roles WHERE name = ?1",
            params![role],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to look up role")?
        .ok_or_else(|| StoreError::UnknownRole(role.to_string()))
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[async_trait]
impl CredentialStore for UserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let email = email.to_string();
        self.with_conn(move |conn| Self::query_one(conn, "u.email", &email))
            .await
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Account>, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| Self::query_one(conn, "u.id", &id))
            .await
    }

    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let created = self
            .with_conn(move |conn| {
                let role_id = Self::role_id(conn, &account.role)?;

                let created = Account {
                    id: Uuid::new_v4(),
                    name: account.name,
                    email: account.email,
                    password_hash: account.password_hash,
                    role: account.role,
                    created_at: Utc::now().to_rfc3339(),
                };

                let inserted = conn.execute(
                    "INSERT INTO users (id, name, email, password_hash, role_id, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        created.id.to_string(),
                        created.name,
                        created.email,
                        created.password_hash,
                        role_id,
                        created.created_at,
                    ],
                );

                match inserted {
                    Ok(_) => Ok(created),
                    Err(e) if is_unique_violation(&e) => {
                        Err(StoreError::DuplicateEmail(created.email))
                    }
                    Err(e) => Err(anyhow::Error::new(e)
                        .context("Failed to insert account")
                        .into()),
                }
            })
            .await?;

        info!("✅ Created account: {} ({})", created.email, created.role);
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<Account>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} ORDER BY u.created_at", ACCOUNT_COLUMNS);
            let mut stmt = conn.prepare(&sql).context("Failed to prepare listing")?;
            let accounts = stmt
                .query_map([], Self::account_from_row)
                .context("Failed to list accounts")?
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read account row")?;
            Ok(accounts)
        })
        .await
    }

    async fn assign_role(&self, id: &Uuid, role: &str) -> Result<Account, StoreError> {
        let id = id.to_string();
        let role = role.to_string();
        let updated = self
            .with_conn(move |conn| {
                let role_id = Self::role_id(conn, &role)?;
                let rows = conn
                    .execute(
                        "UPDATE users SET role_id = ?1 WHERE id = ?2",
                        params![role_id, id],
                    )
                    .context("Failed to update role")?;
                if rows == 0 {
                    return Err(StoreError::AccountNotFound(id));
                }
                Self::query_one(conn, "u.id", &id)?.ok_or(StoreError::AccountNotFound(id))
            })
            .await?;

        info!("🔑 Account {} now has role {}", updated.email, updated.role);
        Ok(updated)
    }
}
