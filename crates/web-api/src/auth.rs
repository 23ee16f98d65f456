//! JWT 认证模块
//!
//! 提供 token 生成、验证，并作为实时引擎的凭证解析器。

use async_trait::async_trait;
use axum::http::HeaderMap;
use config::JwtConfig;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use application::{IdentityError, IdentityResolver, UserDto};
use domain::UserId;

use crate::error::ApiError;

/// JWT Claims 结构
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub exp: i64, // 过期时间 (Unix timestamp)
}

/// JWT Token 服务
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 生成 JWT token
    pub fn generate_token(&self, user_id: Uuid) -> Result<String, ApiError> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::hours(self.config.expiration_hours);

        let claims = Claims {
            user_id,
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| ApiError::internal_server_error(format!("token generation: {}", err)))
    }

    /// 验证并解析 JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|token_data| token_data.claims)
            .map_err(|err| ApiError::unauthorized(format!("invalid token: {}", err)))
    }

    /// 从 headers 中提取和验证 token
    pub fn extract_user_from_headers(&self, headers: &HeaderMap) -> Result<UserId, ApiError> {
        let auth_header = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("invalid authorization header format"))?;

        let claims = self.verify_token(token)?;
        Ok(UserId::from(claims.user_id))
    }
}

/// 实时引擎用同一个 JWT 校验 `join` 信号里的凭证。
#[async_trait]
impl IdentityResolver for JwtService {
    async fn verify(&self, credential: &str) -> Result<UserId, IdentityError> {
        decode::<Claims>(credential, &self.decoding_key, &Validation::default())
            .map(|token_data| UserId::from(token_data.claims.user_id))
            .map_err(|_| IdentityError::Invalid)
    }
}

/// 登录响应结构
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserDto,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "test-secret-key-for-unit-tests-at-least-32".to_string(),
            expiration_hours: 1,
        })
    }

    #[test]
    fn generated_token_round_trips() {
        let service = service();
        let user_id = Uuid::new_v4();
        let token = service.generate_token(user_id).unwrap();
        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert!(claims.exp > chrono::Utc::now().timestamp());
    }

    #[tokio::test]
    async fn resolver_rejects_garbage_credentials() {
        let service = service();
        let result = IdentityResolver::verify(&service, "not-a-token").await;
        assert!(matches!(result, Err(IdentityError::Invalid)));
    }

    #[tokio::test]
    async fn resolver_accepts_its_own_tokens() {
        let service = service();
        let user_id = Uuid::new_v4();
        let token = service.generate_token(user_id).unwrap();
        let resolved = IdentityResolver::verify(&service, &token).await.unwrap();
        assert_eq!(resolved, UserId::from(user_id));
    }
}
