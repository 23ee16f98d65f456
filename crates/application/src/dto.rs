use chrono::NaiveDate;
use domain::{
    FileRecord, FriendRequest, FriendRequestStatus, Group, GroupMembership, GroupRequest,
    GroupRequestStatus, GroupRole, Message, Timestamp, User, UserStatus,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 对其他用户可见的公开档案。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileDto {
    pub id: Uuid,
    pub pseudo: String,
    pub avatar_url: Option<String>,
    pub status: UserStatus,
}

impl From<&User> for UserProfileDto {
    fn from(user: &User) -> Self {
        Self {
            id: Uuid::from(user.id),
            pseudo: user.pseudo.as_str().to_owned(),
            avatar_url: user.avatar_url.clone(),
            status: user.status,
        }
    }
}

/// 本人可见的完整档案，不含密码哈希。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    pub pseudo: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub status: UserStatus,
    pub birthdate: NaiveDate,
    pub friends: Vec<Uuid>,
    pub created_at: Timestamp,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: Uuid::from(user.id),
            pseudo: user.pseudo.as_str().to_owned(),
            email: user.email.as_str().to_owned(),
            avatar_url: user.avatar_url.clone(),
            status: user.status,
            birthdate: user.birthdate.as_date(),
            friends: user.friends.iter().copied().map(Uuid::from).collect(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestDto {
    pub id: Uuid,
    pub sender: UserProfileDto,
    pub receiver: UserProfileDto,
    pub status: FriendRequestStatus,
    pub created_at: Timestamp,
}

impl FriendRequestDto {
    pub fn hydrate(request: &FriendRequest, sender: &User, receiver: &User) -> Self {
        Self {
            id: Uuid::from(request.id),
            sender: UserProfileDto::from(sender),
            receiver: UserProfileDto::from(receiver),
            status: request.status,
            created_at: request.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDto {
    pub id: Uuid,
    pub name: String,
    pub is_public: bool,
    pub owner_id: Uuid,
    pub created_at: Timestamp,
}

impl From<&Group> for GroupDto {
    fn from(group: &Group) -> Self {
        Self {
            id: Uuid::from(group.id),
            name: group.name.clone(),
            is_public: group.is_public,
            owner_id: Uuid::from(group.owner_id),
            created_at: group.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMemberDto {
    pub user: UserProfileDto,
    pub role: GroupRole,
    pub joined_at: Timestamp,
}

impl GroupMemberDto {
    pub fn hydrate(membership: &GroupMembership, user: &User) -> Self {
        Self {
            user: UserProfileDto::from(user),
            role: membership.role,
            joined_at: membership.joined_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRequestDto {
    pub id: Uuid,
    pub group: GroupDto,
    pub user: UserProfileDto,
    pub status: GroupRequestStatus,
    pub created_at: Timestamp,
}

impl GroupRequestDto {
    pub fn hydrate(request: &GroupRequest, group: &Group, user: &User) -> Self {
        Self {
            id: Uuid::from(request.id),
            group: GroupDto::from(group),
            user: UserProfileDto::from(user),
            status: request.status,
            created_at: request.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDto {
    pub id: Uuid,
    pub url: String,
}

impl From<&FileRecord> for FileDto {
    fn from(file: &FileRecord) -> Self {
        Self {
            id: Uuid::from(file.id),
            url: file.url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub content: Option<String>,
    pub file: Option<FileDto>,
    pub created_at: Timestamp,
}

impl MessageDto {
    pub fn hydrate(message: &Message, file: Option<&FileRecord>) -> Self {
        Self {
            id: Uuid::from(message.id),
            sender_id: Uuid::from(message.sender_id),
            receiver_id: message.receiver_id.map(Uuid::from),
            group_id: message.group_id.map(Uuid::from),
            content: message.content.as_ref().map(|c| c.as_str().to_owned()),
            file: file.map(FileDto::from),
            created_at: message.created_at,
        }
    }
}
