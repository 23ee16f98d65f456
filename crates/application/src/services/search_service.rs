use std::sync::Arc;

use domain::UserId;

use crate::dto::{GroupDto, UserProfileDto};
use crate::error::ApplicationError;
use crate::repository::{GroupRepository, UserRepository};

pub struct SearchServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub group_repository: Arc<dyn GroupRepository>,
}

/// 按昵称搜用户、按名称搜公开群组。大小写不敏感的子串匹配。
pub struct SearchService {
    deps: SearchServiceDependencies,
}

impl SearchService {
    pub fn new(deps: SearchServiceDependencies) -> Self {
        Self { deps }
    }

    /// 搜索结果不包含发起人自己。
    pub async fn search_users(
        &self,
        caller_id: UserId,
        query: &str,
    ) -> Result<Vec<UserProfileDto>, ApplicationError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let users = self.deps.user_repository.search_by_pseudo(query).await?;
        Ok(users
            .iter()
            .filter(|u| u.id != caller_id)
            .map(UserProfileDto::from)
            .collect())
    }

    /// 只返回公开群组。
    pub async fn search_groups(&self, query: &str) -> Result<Vec<GroupDto>, ApplicationError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let groups = self.deps.group_repository.search_public(query).await?;
        Ok(groups.iter().map(GroupDto::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::{NaiveDate, TimeZone, Utc};
    use domain::{
        BirthDate, Group, GroupId, GroupMembership, PasswordHash, Pseudo, User, UserEmail,
    };
    use uuid::Uuid;

    fn sample_user(pseudo: &str) -> User {
        User::register(
            User::next_id(),
            Pseudo::parse(pseudo).unwrap(),
            UserEmail::parse(&format!("{pseudo}@example.com")).unwrap(),
            PasswordHash::new("$2b$12$hash").unwrap(),
            BirthDate::from_stored(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    fn service(store: &MemoryStore) -> SearchService {
        SearchService::new(SearchServiceDependencies {
            user_repository: Arc::new(store.clone()),
            group_repository: Arc::new(store.clone()),
        })
    }

    #[tokio::test]
    async fn user_search_excludes_the_caller() {
        let store = MemoryStore::new();
        let alice = sample_user("alice");
        let alicia = sample_user("alicia");
        let bob = sample_user("bob");
        for user in [&alice, &alicia, &bob] {
            UserRepository::create(&store, user.clone()).await.unwrap();
        }
        let service = service(&store);

        let results = service.search_users(alice.id, "ali").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].pseudo, "alicia");

        assert!(service.search_users(alice.id, "  ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn group_search_only_returns_public_groups() {
        let store = MemoryStore::new();
        let alice = sample_user("alice");
        UserRepository::create(&store, alice.clone()).await.unwrap();

        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        for (name, public) in [("rust-club", true), ("rust-cabal", false)] {
            let group =
                Group::create(GroupId::from(Uuid::new_v4()), name, public, alice.id, now).unwrap();
            let owner = GroupMembership::admin(group.id, alice.id, now);
            GroupRepository::create_with_owner(&store, group, owner)
                .await
                .unwrap();
        }
        let service = service(&store);

        let results = service.search_groups("RUST").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "rust-club");
    }
}
