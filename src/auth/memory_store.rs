//! In-process credential store, used by tests and local experiments.

use crate::auth::{
    models::{Account, NewAccount, SEEDED_ROLES},
    user_store::{CredentialStore, StoreError},
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub struct InMemoryUserStore {
    roles: HashSet<String>,
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            roles: SEEDED_ROLES.iter().map(|r| r.to_string()).collect(),
            accounts: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .accounts
            .read()
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.read().get(id).cloned())
    }

    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        if !self.roles.contains(&account.role) {
            return Err(StoreError::UnknownRole(account.role));
        }

        // Check and insert under one write lock so racing signups cannot both pass.
        let mut accounts = self.accounts.write();
        if accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::DuplicateEmail(account.email));
        }

        let created = Account {
            id: Uuid::new_v4(),
            name: account.name,
            email: account.email,
            password_hash: account.password_hash,
            role: account.role,
            created_at: Utc::now().to_rfc3339(),
        };
        accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self.accounts.read().values().cloned().collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(accounts)
    }

    async fn assign_role(&self, id: &Uuid, role: &str) -> Result<Account, StoreError> {
        if !self.roles.contains(role) {
            return Err(StoreError::UnknownRole(role.to_string()));
        }

        let mut accounts = self.accounts.write();
        let account = accounts
            .get_mut(id)
            .ok_or_else(|| StoreError::AccountNotFound(id.to_string()))?;
        account.role = role.to_string();
        Ok(account.clone())
    }
}
