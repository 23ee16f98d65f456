use std::sync::Arc;

use chrono::NaiveDate;
use domain::{BirthDate, DomainError, Pseudo, User, UserEmail};

use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::password::PasswordHasher;
use crate::repository::UserRepository;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub pseudo: String,
    pub email: String,
    pub password: String,
    pub birthdate: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub struct AuthServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
}

/// 注册与登录。
pub struct AuthService {
    deps: AuthServiceDependencies,
}

impl AuthService {
    pub fn new(deps: AuthServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<User, ApplicationError> {
        let pseudo = Pseudo::parse(request.pseudo)?;
        let email = UserEmail::parse(request.email)?;
        validate_password(&request.password)?;
        let now = self.deps.clock.now();
        let birthdate = BirthDate::parse(request.birthdate, now.date_naive())?;

        if self
            .deps
            .user_repository
            .find_by_pseudo(pseudo.clone())
            .await?
            .is_some()
        {
            return Err(DomainError::PseudoAlreadyTaken.into());
        }
        if self
            .deps
            .user_repository
            .find_by_email(email.clone())
            .await?
            .is_some()
        {
            return Err(DomainError::EmailAlreadyRegistered.into());
        }

        let password_hash = self.deps.password_hasher.hash(&request.password).await?;
        let user = User::register(User::next_id(), pseudo, email, password_hash, birthdate, now);

        let stored = self.deps.user_repository.create(user).await?;
        tracing::info!(user_id = %stored.id, "user registered");
        Ok(stored)
    }

    /// 登录失败统一返回认证错误，不区分"账号不存在"和"密码错误"。
    pub async fn login(&self, request: LoginRequest) -> Result<User, ApplicationError> {
        let email = UserEmail::parse(request.email)?;
        let user = self
            .deps
            .user_repository
            .find_by_email(email)
            .await?
            .ok_or(ApplicationError::Authentication)?;

        let password_ok = self
            .deps
            .password_hasher
            .verify(&request.password, &user.password)
            .await?;
        if !password_ok {
            return Err(ApplicationError::Authentication);
        }

        Ok(user)
    }
}

pub(super) fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(DomainError::invalid_argument(
            "password",
            "must be at least 6 characters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::memory::MemoryStore;
    use crate::password::PasswordHasherError;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use domain::{PasswordHash, UserStatus};

    /// 可逆的"哈希"，只用于测试。
    pub(crate) struct PlainHasher;

    #[async_trait]
    impl PasswordHasher for PlainHasher {
        async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError> {
            Ok(PasswordHash::new(format!("plain:{plaintext}")).unwrap())
        }

        async fn verify(
            &self,
            plaintext: &str,
            hashed: &PasswordHash,
        ) -> Result<bool, PasswordHasherError> {
            Ok(hashed.as_str() == format!("plain:{plaintext}"))
        }
    }

    fn service(store: &MemoryStore) -> AuthService {
        AuthService::new(AuthServiceDependencies {
            user_repository: Arc::new(store.clone()),
            password_hasher: Arc::new(PlainHasher),
            clock: Arc::new(FixedClock(
                Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            )),
        })
    }

    fn signup_request(pseudo: &str, email: &str) -> SignupRequest {
        SignupRequest {
            pseudo: pseudo.to_owned(),
            email: email.to_owned(),
            password: "secret42".to_owned(),
            birthdate: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn signup_creates_offline_user() {
        let store = MemoryStore::new();
        let service = service(&store);

        let user = service
            .signup(signup_request("alice", "alice@example.com"))
            .await
            .unwrap();

        assert_eq!(user.pseudo.as_str(), "alice");
        assert_eq!(user.status, UserStatus::Offline);
        assert!(user.friends.is_empty());
    }

    #[tokio::test]
    async fn signup_rejects_duplicate_pseudo_and_email() {
        let store = MemoryStore::new();
        let service = service(&store);
        service
            .signup(signup_request("alice", "alice@example.com"))
            .await
            .unwrap();

        let same_pseudo = service
            .signup(signup_request("alice", "other@example.com"))
            .await;
        assert!(matches!(
            same_pseudo,
            Err(ApplicationError::Domain(DomainError::PseudoAlreadyTaken))
        ));

        let same_email = service
            .signup(signup_request("bob", "alice@example.com"))
            .await;
        assert!(matches!(
            same_email,
            Err(ApplicationError::Domain(
                DomainError::EmailAlreadyRegistered
            ))
        ));
    }

    #[tokio::test]
    async fn signup_rejects_underage_and_short_password() {
        let store = MemoryStore::new();
        let service = service(&store);

        let mut underage = signup_request("kid", "kid@example.com");
        underage.birthdate = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert!(matches!(
            service.signup(underage).await,
            Err(ApplicationError::Domain(DomainError::Underage))
        ));

        let mut short = signup_request("carol", "carol@example.com");
        short.password = "abc".to_owned();
        assert!(service.signup(short).await.is_err());
    }

    #[tokio::test]
    async fn login_does_not_reveal_which_part_failed() {
        let store = MemoryStore::new();
        let service = service(&store);
        service
            .signup(signup_request("alice", "alice@example.com"))
            .await
            .unwrap();

        let wrong_password = service
            .login(LoginRequest {
                email: "alice@example.com".to_owned(),
                password: "nope42".to_owned(),
            })
            .await;
        let unknown_user = service
            .login(LoginRequest {
                email: "ghost@example.com".to_owned(),
                password: "secret42".to_owned(),
            })
            .await;

        assert!(matches!(
            wrong_password,
            Err(ApplicationError::Authentication)
        ));
        assert!(matches!(unknown_user, Err(ApplicationError::Authentication)));

        let ok = service
            .login(LoginRequest {
                email: "alice@example.com".to_owned(),
                password: "secret42".to_owned(),
            })
            .await;
        assert!(ok.is_ok());
    }
}
