use std::sync::Arc;

use domain::{DomainError, Pseudo, User, UserId, UserStatus};

use crate::dto::{UserDto, UserProfileDto};
use crate::error::ApplicationError;
use crate::password::PasswordHasher;
use crate::repository::UserRepository;

use super::auth_service::validate_password;

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
}

/// 账号与档案管理。
pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    async fn load(&self, user_id: UserId) -> Result<User, ApplicationError> {
        self.deps
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound.into())
    }

    pub async fn profile(&self, user_id: UserId) -> Result<UserDto, ApplicationError> {
        let user = self.load(user_id).await?;
        Ok(UserDto::from(&user))
    }

    /// 其他用户可见的公开档案。
    pub async fn public_profile(
        &self,
        user_id: UserId,
    ) -> Result<UserProfileDto, ApplicationError> {
        let user = self.load(user_id).await?;
        Ok(UserProfileDto::from(&user))
    }

    pub async fn change_pseudo(
        &self,
        user_id: UserId,
        pseudo: String,
    ) -> Result<UserDto, ApplicationError> {
        let pseudo = Pseudo::parse(pseudo)?;
        let mut user = self.load(user_id).await?;
        if user.pseudo == pseudo {
            return Ok(UserDto::from(&user));
        }
        if self
            .deps
            .user_repository
            .find_by_pseudo(pseudo.clone())
            .await?
            .is_some()
        {
            return Err(DomainError::PseudoAlreadyTaken.into());
        }
        user.change_pseudo(pseudo);
        let stored = self.deps.user_repository.update(user).await?;
        Ok(UserDto::from(&stored))
    }

    pub async fn set_avatar(
        &self,
        user_id: UserId,
        avatar_url: String,
    ) -> Result<UserDto, ApplicationError> {
        if avatar_url.trim().is_empty() {
            return Err(DomainError::invalid_argument("avatarUrl", "cannot be empty").into());
        }
        let mut user = self.load(user_id).await?;
        user.set_avatar(avatar_url);
        let stored = self.deps.user_repository.update(user).await?;
        Ok(UserDto::from(&stored))
    }

    /// 改密码前必须先验证旧密码。
    pub async fn change_password(
        &self,
        user_id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), ApplicationError> {
        validate_password(new_password)?;
        let mut user = self.load(user_id).await?;
        let old_ok = self
            .deps
            .password_hasher
            .verify(old_password, &user.password)
            .await?;
        if !old_ok {
            return Err(ApplicationError::Authentication);
        }
        let hash = self.deps.password_hasher.hash(new_password).await?;
        user.set_password(hash);
        self.deps.user_repository.update(user).await?;
        tracing::info!(user_id = %user_id, "password changed");
        Ok(())
    }

    pub async fn set_status(
        &self,
        user_id: UserId,
        status: UserStatus,
    ) -> Result<(), ApplicationError> {
        self.load(user_id).await?;
        self.deps.user_repository.set_status(user_id, status).await?;
        Ok(())
    }

    pub async fn delete_account(&self, user_id: UserId) -> Result<(), ApplicationError> {
        self.load(user_id).await?;
        self.deps.user_repository.delete(user_id).await?;
        tracing::info!(user_id = %user_id, "account deleted");
        Ok(())
    }

    pub async fn list_friends(
        &self,
        user_id: UserId,
    ) -> Result<Vec<UserProfileDto>, ApplicationError> {
        let user = self.load(user_id).await?;
        let friends = self.deps.user_repository.find_many(&user.friends).await?;
        Ok(friends.iter().map(UserProfileDto::from).collect())
    }
}
