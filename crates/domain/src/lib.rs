//! 社交聊天系统核心领域模型
//!
//! 包含用户、好友关系、群组、消息等核心实体，以及相关的业务规则。

pub mod errors;
pub mod file;
pub mod friend_request;
pub mod group;
pub mod message;
pub mod user;
pub mod value_objects;

pub use errors::{DomainError, DomainResult, RepositoryError};
pub use file::FileRecord;
pub use friend_request::{FriendRequest, FriendRequestStatus};
pub use group::{Group, GroupMembership, GroupRequest, GroupRequestStatus, GroupRole};
pub use message::{Message, MessageContent};
pub use user::{User, UserStatus};
pub use value_objects::{
    BirthDate, FileId, GroupId, MessageId, PasswordHash, Pseudo, RequestId, Timestamp, UserEmail,
    UserId,
};
