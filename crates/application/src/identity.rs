use async_trait::async_trait;
use domain::UserId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid credential")]
    Invalid,
}

/// 凭证解析器。把不透明的 bearer 凭证映射为用户身份。
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<UserId, IdentityError>;
}
