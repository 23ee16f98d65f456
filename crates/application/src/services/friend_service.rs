use std::sync::Arc;

use domain::{
    DomainError, FriendRequest, FriendRequestStatus, RequestId, User, UserId,
};
use uuid::Uuid;

use crate::clock::Clock;
use crate::dto::FriendRequestDto;
use crate::error::ApplicationError;
use crate::repository::{FriendRequestRepository, UserRepository};

pub struct FriendServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub friend_request_repository: Arc<dyn FriendRequestRepository>,
    pub clock: Arc<dyn Clock>,
}

/// 好友请求的生命周期：发送、列出、接受 / 拒绝、解除好友。
pub struct FriendService {
    deps: FriendServiceDependencies,
}

impl FriendService {
    pub fn new(deps: FriendServiceDependencies) -> Self {
        Self { deps }
    }

    async fn load_user(&self, id: UserId) -> Result<User, ApplicationError> {
        self.deps
            .user_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound.into())
    }

    pub async fn send_request(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
    ) -> Result<FriendRequestDto, ApplicationError> {
        let sender = self.load_user(sender_id).await?;
        let receiver = self.load_user(receiver_id).await?;

        if sender.is_friend_with(receiver_id) {
            return Err(DomainError::AlreadyFriends.into());
        }
        // 任一方向已有未决请求都算重复
        if let Some(existing) = self
            .deps
            .friend_request_repository
            .find_between(sender_id, receiver_id)
            .await?
        {
            if existing.status == FriendRequestStatus::Pending {
                return Err(DomainError::FriendRequestAlreadySent.into());
            }
        }

        let request = FriendRequest::new(
            RequestId::from(Uuid::new_v4()),
            sender_id,
            receiver_id,
            self.deps.clock.now(),
        )?;
        let stored = self.deps.friend_request_repository.create(request).await?;
        tracing::info!(sender = %sender_id, receiver = %receiver_id, "friend request sent");
        Ok(FriendRequestDto::hydrate(&stored, &sender, &receiver))
    }

    pub async fn list_pending(
        &self,
        user_id: UserId,
    ) -> Result<Vec<FriendRequestDto>, ApplicationError> {
        let requests = self
            .deps
            .friend_request_repository
            .list_pending_for(user_id)
            .await?;

        let mut ids: Vec<UserId> = Vec::new();
        for request in &requests {
            ids.push(request.sender_id);
            ids.push(request.receiver_id);
        }
        let users = self.deps.user_repository.find_many(&ids).await?;
        let by_id = |id: UserId| users.iter().find(|u| u.id == id);

        let mut dtos = Vec::with_capacity(requests.len());
        for request in &requests {
            // 参与者已删号的请求直接跳过
            let (Some(sender), Some(receiver)) =
                (by_id(request.sender_id), by_id(request.receiver_id))
            else {
                continue;
            };
            dtos.push(FriendRequestDto::hydrate(request, sender, receiver));
        }
        Ok(dtos)
    }

    /// 接受或拒绝请求。只有接收方能表态，终态的请求不能再表态。
    pub async fn answer(
        &self,
        user_id: UserId,
        request_id: RequestId,
        accept: bool,
    ) -> Result<FriendRequestDto, ApplicationError> {
        let mut request = self
            .deps
            .friend_request_repository
            .find_by_id(request_id)
            .await?
            .ok_or(DomainError::FriendRequestNotFound)?;
        if request.receiver_id != user_id {
            return Err(DomainError::NotRequestReceiver.into());
        }

        if accept {
            request.accept()?;
            self.deps
                .friend_request_repository
                .accept(request_id, request.sender_id, request.receiver_id)
                .await?;
        } else {
            request.deny()?;
            self.deps
                .friend_request_repository
                .mark_denied(request_id)
                .await?;
        }
        tracing::info!(
            request_id = %request_id,
            status = request.status.as_str(),
            "friend request answered"
        );

        let sender = self.load_user(request.sender_id).await?;
        let receiver = self.load_user(request.receiver_id).await?;
        Ok(FriendRequestDto::hydrate(&request, &sender, &receiver))
    }

    /// 解除好友：删除请求行并同时从双方好友列表移除，原子生效。
    pub async fn unfriend(
        &self,
        user_id: UserId,
        friend_id: UserId,
    ) -> Result<(), ApplicationError> {
        let user = self.load_user(user_id).await?;
        if !user.is_friend_with(friend_id) {
            return Err(DomainError::NotFriends.into());
        }
        self.deps
            .friend_request_repository
            .unfriend(user_id, friend_id)
            .await?;
        tracing::info!(user = %user_id, friend = %friend_id, "friendship removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::memory::MemoryStore;
    use chrono::{NaiveDate, TimeZone, Utc};
    use domain::{BirthDate, PasswordHash, Pseudo, UserEmail};

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

    fn service(store: &MemoryStore) -> FriendService {
        FriendService::new(FriendServiceDependencies {
            user_repository: Arc::new(store.clone()),
            friend_request_repository: Arc::new(store.clone()),
            clock: Arc::new(FixedClock(
                Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            )),
        })
    }

    async fn seed_two(store: &MemoryStore) -> (User, User) {
        let alice = sample_user("alice");
        let bob = sample_user("bob");
        UserRepository::create(store, alice.clone()).await.unwrap();
        UserRepository::create(store, bob.clone()).await.unwrap();
        (alice, bob)
    }

    async fn stored_user(store: &MemoryStore, id: UserId) -> User {
        UserRepository::find_by_id(store, id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn duplicate_requests_are_rejected_in_both_directions() {
        let store = MemoryStore::new();
        let (alice, bob) = seed_two(&store).await;
        let service = service(&store);

        service.send_request(alice.id, bob.id).await.unwrap();

        let again = service.send_request(alice.id, bob.id).await;
        assert!(matches!(
            again,
            Err(ApplicationError::Domain(
                DomainError::FriendRequestAlreadySent
            ))
        ));

        let reversed = service.send_request(bob.id, alice.id).await;
        assert!(matches!(
            reversed,
            Err(ApplicationError::Domain(
                DomainError::FriendRequestAlreadySent
            ))
        ));
    }

    #[tokio::test]
    async fn accepting_makes_both_sides_friends_atomically() {
        let store = MemoryStore::new();
        let (alice, bob) = seed_two(&store).await;
        let service = service(&store);

        let request = service.send_request(alice.id, bob.id).await.unwrap();
        let answered = service
            .answer(bob.id, RequestId::from(request.id), true)
            .await
            .unwrap();
        assert_eq!(answered.status, FriendRequestStatus::Accepted);

        let alice_after = stored_user(&store, alice.id).await;
        let bob_after = stored_user(&store, bob.id).await;
        assert!(alice_after.is_friend_with(bob.id));
        assert!(bob_after.is_friend_with(alice.id));

        // 已成好友后不能再发请求
        let again = service.send_request(bob.id, alice.id).await;
        assert!(matches!(
            again,
            Err(ApplicationError::Domain(DomainError::AlreadyFriends))
        ));
    }

    #[tokio::test]
    async fn only_the_receiver_can_answer() {
        let store = MemoryStore::new();
        let (alice, bob) = seed_two(&store).await;
        let service = service(&store);

        let request = service.send_request(alice.id, bob.id).await.unwrap();
        let by_sender = service
            .answer(alice.id, RequestId::from(request.id), true)
            .await;
        assert!(matches!(
            by_sender,
            Err(ApplicationError::Domain(DomainError::NotRequestReceiver))
        ));
    }

    #[tokio::test]
    async fn answering_twice_fails() {
        let store = MemoryStore::new();
        let (alice, bob) = seed_two(&store).await;
        let service = service(&store);

        let request = service.send_request(alice.id, bob.id).await.unwrap();
        let id = RequestId::from(request.id);
        service.answer(bob.id, id, false).await.unwrap();

        let again = service.answer(bob.id, id, true).await;
        assert!(matches!(
            again,
            Err(ApplicationError::Domain(
                DomainError::FriendRequestResolved
            ))
        ));
    }

    #[tokio::test]
    async fn unfriend_removes_request_row_and_both_lists() {
        let store = MemoryStore::new();
        let (alice, bob) = seed_two(&store).await;
        let service = service(&store);

        let request = service.send_request(alice.id, bob.id).await.unwrap();
        service
            .answer(bob.id, RequestId::from(request.id), true)
            .await
            .unwrap();

        service.unfriend(alice.id, bob.id).await.unwrap();

        let alice_after = stored_user(&store, alice.id).await;
        let bob_after = stored_user(&store, bob.id).await;
        assert!(!alice_after.is_friend_with(bob.id));
        assert!(!bob_after.is_friend_with(alice.id));
        assert!(store
            .find_between(alice.id, bob.id)
            .await
            .unwrap()
            .is_none());

        // 请求行已删，可以重新发起
        assert!(service.send_request(bob.id, alice.id).await.is_ok());
    }

    #[tokio::test]
    async fn unfriend_requires_friendship() {
        let store = MemoryStore::new();
        let (alice, bob) = seed_two(&store).await;
        let service = service(&store);

        let result = service.unfriend(alice.id, bob.id).await;
        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::NotFriends))
        ));
    }
}
