//! 密码哈希端口。
//!
//! 注册与改密时生成哈希，登录时校验；具体算法由基础设施层提供，
//! 服务层只依赖这个抽象。

use async_trait::async_trait;
use domain::PasswordHash;
use thiserror::Error;

/// 哈希或校验过程中的内部故障。对客户端一律表现为内部错误，
/// 不暴露算法细节。
#[derive(Debug, Error)]
#[error("password {operation} failed: {reason}")]
pub struct PasswordHasherError {
    operation: &'static str,
    reason: String,
}

impl PasswordHasherError {
    pub fn hashing(reason: impl Into<String>) -> Self {
        Self {
            operation: "hashing",
            reason: reason.into(),
        }
    }

    pub fn verification(reason: impl Into<String>) -> Self {
        Self {
            operation: "verification",
            reason: reason.into(),
        }
    }
}

/// 密码哈希器。`verify` 用 `Ok(false)` 表示密码不匹配，
/// `Err` 只留给算法本身的故障。
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError>;
    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError>;
}
