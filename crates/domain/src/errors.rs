//! 领域模型错误定义

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed: {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("you must be 13 or older")]
    Underage,

    #[error("user not found")]
    UserNotFound,

    #[error("pseudo already taken")]
    PseudoAlreadyTaken,

    #[error("email already registered")]
    EmailAlreadyRegistered,

    #[error("users are not friends")]
    NotFriends,

    #[error("users are already friends")]
    AlreadyFriends,

    #[error("friend request already sent")]
    FriendRequestAlreadySent,

    #[error("friend request not found")]
    FriendRequestNotFound,

    #[error("not the receiver of this request")]
    NotRequestReceiver,

    #[error("friend request already resolved")]
    FriendRequestResolved,

    #[error("group not found")]
    GroupNotFound,

    #[error("user is not a group member")]
    NotGroupMember,

    #[error("user is already a group member")]
    AlreadyGroupMember,

    #[error("only the group owner may do this")]
    NotGroupOwner,

    #[error("only a group admin may do this")]
    NotGroupAdmin,

    #[error("group is private")]
    GroupIsPrivate,

    #[error("the owner cannot leave their own group")]
    OwnerCannotLeave,

    #[error("invitation not found")]
    InvitationNotFound,

    #[error("invitation already sent")]
    InvitationAlreadySent,

    #[error("invitation already resolved")]
    InvitationResolved,

    #[error("message must target a friend or a group")]
    InvalidMessageTarget,
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;

/// 持久层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("unique constraint violated")]
    Conflict,
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
