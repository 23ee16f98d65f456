use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{RequestId, Timestamp, UserId};

/// 好友请求状态。一旦进入终态（ACCEPTED / DENIED）就不再变化。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Denied,
}

impl FriendRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendRequestStatus::Pending => "PENDING",
            FriendRequestStatus::Accepted => "ACCEPTED",
            FriendRequestStatus::Denied => "DENIED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(FriendRequestStatus::Pending),
            "ACCEPTED" => Some(FriendRequestStatus::Accepted),
            "DENIED" => Some(FriendRequestStatus::Denied),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, FriendRequestStatus::Pending)
    }
}

/// 有向的好友请求，(sender, receiver) 对上唯一。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: RequestId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub status: FriendRequestStatus,
    pub created_at: Timestamp,
}

impl FriendRequest {
    pub fn new(
        id: RequestId,
        sender_id: UserId,
        receiver_id: UserId,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if sender_id == receiver_id {
            return Err(DomainError::invalid_argument(
                "receiver",
                "cannot send a friend request to yourself",
            ));
        }
        Ok(Self {
            id,
            sender_id,
            receiver_id,
            status: FriendRequestStatus::Pending,
            created_at: now,
        })
    }

    pub fn accept(&mut self) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::FriendRequestResolved);
        }
        self.status = FriendRequestStatus::Accepted;
        Ok(())
    }

    pub fn deny(&mut self) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::FriendRequestResolved);
        }
        self.status = FriendRequestStatus::Denied;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn request() -> FriendRequest {
        FriendRequest::new(
            RequestId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            UserId::from(Uuid::new_v4()),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn cannot_request_self() {
        let id = UserId::from(Uuid::new_v4());
        let result = FriendRequest::new(
            RequestId::from(Uuid::new_v4()),
            id,
            id,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn terminal_states_are_final() {
        let mut req = request();
        req.accept().unwrap();
        assert_eq!(req.status, FriendRequestStatus::Accepted);
        assert!(req.deny().is_err());
        assert!(req.accept().is_err());
    }
}
