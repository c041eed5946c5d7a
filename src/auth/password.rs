//! Password Hashing
//! Mission: One-way bcrypt hashing kept off the async executor

use anyhow::{Context, Result};
use tracing::debug;

/// Plaintext hashed once at startup to give unknown-email logins a real digest to check.
const DUMMY_PASSWORD: &str = "inventory-dummy-password";

/// bcrypt hasher with a fixed work factor
pub struct PasswordHasher {
    cost: u32,
    dummy_hash: String,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self> {
        let dummy_hash = bcrypt::hash(DUMMY_PASSWORD, cost).context("Failed to hash password")?;
        Ok(Self { cost, dummy_hash })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password with a fresh random salt
    pub async fn hash(&self, plaintext: String) -> Result<String> {
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
            .await
            .context("Password hashing task failed")?
            .context("Failed to hash password")
    }

    /// Check a plaintext password against a stored digest.
    ///
    /// A digest bcrypt cannot parse never matches.
    pub async fn verify(&self, plaintext: String, digest: String) -> Result<bool> {
        let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &digest))
            .await
            .context("Password verification task failed")?;

        match outcome {
            Ok(valid) => Ok(valid),
            Err(e) => {
                debug!("Stored digest rejected by bcrypt: {}", e);
                Ok(false)
            }
        }
    }

    /// Burn the same work as a real verification; always `false`.
    pub async fn verify_dummy(&self, plaintext: String) -> Result<bool> {
        self.verify(plaintext, self.dummy_hash.clone()).await?;
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = PasswordHasher::new(TEST_COST).unwrap();

        let digest = hasher.hash("p".to_string()).await.unwrap();
        assert_ne!(digest, "p");
        assert!(digest.starts_with("$2"));

        assert!(hasher.verify("p".to_string(), digest.clone()).await.unwrap());
        assert!(!hasher.verify("wrong".to_string(), digest).await.unwrap());
    }

    #[tokio::test]
    async fn test_salt_differs_per_call() {
        let hasher = PasswordHasher::new(TEST_COST).unwrap();

        let first = hasher.hash("same".to_string()).await.unwrap();
        let second = hasher.hash("same".to_string()).await.unwrap();
        assert_ne!(first, second);

        assert!(hasher.verify("same".to_string(), first).await.unwrap());
        assert!(hasher.verify("same".to_string(), second).await.unwrap());
    }

    #[tokio::test]
    async fn test_unparseable_digest_does_not_match() {
        let hasher = PasswordHasher::new(TEST_COST).unwrap();
        assert!(!hasher
            .verify("p".to_string(), "not-a-bcrypt-hash".to_string())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_dummy_verify_never_matches() {
        let hasher = PasswordHasher::new(TEST_COST).unwrap();
        assert!(!hasher
            .verify_dummy(DUMMY_PASSWORD.to_string())
            .await
            .unwrap());
    }

    #[test]
    fn test_cost_is_applied() {
        let hasher = PasswordHasher::new(5).unwrap();
        assert_eq!(hasher.cost(), 5);
        assert!(hasher.dummy_hash.contains("$05$"));
    }
}
