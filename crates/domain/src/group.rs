use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{GroupId, RequestId, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub is_public: bool,
    pub owner_id: UserId,
    pub created_at: Timestamp,
}

impl Group {
    pub fn create(
        id: GroupId,
        name: impl Into<String>,
        is_public: bool,
        owner_id: UserId,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(DomainError::invalid_argument("name", "cannot be empty"));
        }
        if name.len() > 50 {
            return Err(DomainError::invalid_argument("name", "too long"));
        }
        Ok(Self {
            id,
            name,
            is_public,
            owner_id,
            created_at: now,
        })
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }

    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), DomainError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(DomainError::invalid_argument("name", "cannot be empty"));
        }
        self.name = name;
        Ok(())
    }
}

/// 群组成员角色。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupRole {
    Member,
    Admin,
}

impl GroupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRole::Member => "MEMBER",
            GroupRole::Admin => "ADMIN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "MEMBER" => Some(GroupRole::Member),
            "ADMIN" => Some(GroupRole::Admin),
            _ => None,
        }
    }
}

/// 群组成员关系，(group, user) 对上唯一。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub role: GroupRole,
    pub joined_at: Timestamp,
}

impl GroupMembership {
    pub fn member(group_id: GroupId, user_id: UserId, now: Timestamp) -> Self {
        Self {
            group_id,
            user_id,
            role: GroupRole::Member,
            joined_at: now,
        }
    }

    pub fn admin(group_id: GroupId, user_id: UserId, now: Timestamp) -> Self {
        Self {
            group_id,
            user_id,
            role: GroupRole::Admin,
            joined_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == GroupRole::Admin
    }
}

/// 群组邀请状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl GroupRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRequestStatus::Pending => "PENDING",
            GroupRequestStatus::Accepted => "ACCEPTED",
            GroupRequestStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(GroupRequestStatus::Pending),
            "ACCEPTED" => Some(GroupRequestStatus::Accepted),
            "REJECTED" => Some(GroupRequestStatus::Rejected),
            _ => None,
        }
    }
}

/// 群组邀请，(group, user) 对上唯一。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRequest {
    pub id: RequestId,
    pub group_id: GroupId,
    pub user_id: UserId,
    pub status: GroupRequestStatus,
    pub created_at: Timestamp,
}

impl GroupRequest {
    pub fn invite(id: RequestId, group_id: GroupId, user_id: UserId, now: Timestamp) -> Self {
        Self {
            id,
            group_id,
            user_id,
            status: GroupRequestStatus::Pending,
            created_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == GroupRequestStatus::Pending
    }
}
