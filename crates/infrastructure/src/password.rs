//! bcrypt 密码哈希实现。
//!
//! bcrypt 是 CPU 密集操作，全部放进 `spawn_blocking` 执行，
//! 避免占住异步运行时的工作线程。

use application::{PasswordHasher, PasswordHasherError};
use async_trait::async_trait;
use bcrypt::DEFAULT_COST;
use domain::PasswordHash;

/// cost 可配置：生产走 DEFAULT_COST，测试降到 4 提速。
#[derive(Clone)]
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl BcryptPasswordHasher {
    pub fn new(cost: Option<u32>) -> Self {
        Self {
            cost: cost.unwrap_or(DEFAULT_COST),
        }
    }
}

#[async_trait]
impl PasswordHasher for BcryptPasswordHasher {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError> {
        let cost = self.cost;
        let plaintext = plaintext.to_owned();
        let digest = tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
            .await
            .map_err(|err| PasswordHasherError::hashing(err.to_string()))?
            .map_err(|err| PasswordHasherError::hashing(err.to_string()))?;

        PasswordHash::new(digest).map_err(|err| PasswordHasherError::hashing(err.to_string()))
    }

    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError> {
        let plaintext = plaintext.to_owned();
        let digest = hashed.as_str().to_owned();
        tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &digest))
            .await
            .map_err(|err| PasswordHasherError::verification(err.to_string()))?
            .map_err(|err| PasswordHasherError::verification(err.to_string()))
    }
}

impl Default for BcryptPasswordHasher {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify_round_trips() {
        let hasher = BcryptPasswordHasher::new(Some(4));

        let stored = hasher.hash("secret-pass").await.expect("hash");
        assert_ne!(stored.as_str(), "secret-pass", "哈希不能是明文");

        assert!(hasher.verify("secret-pass", &stored).await.expect("verify"));
        assert!(!hasher
            .verify("wrong-pass", &stored)
            .await
            .expect("verify mismatch"));
    }

    #[test]
    fn errors_name_the_failing_operation() {
        let hashing = PasswordHasherError::hashing("pool shut down");
        assert!(hashing.to_string().contains("hashing"));

        let verification = PasswordHasherError::verification("pool shut down");
        assert!(verification.to_string().contains("verification"));
    }
}
