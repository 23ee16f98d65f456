use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// 对外错误消息目录。每类失败一条固定文案，客户端据此展示提示。
pub mod catalog {
    pub const INVALID_CREDENTIALS: &str = "invalid credentials";
    pub const USER_NOT_FOUND: &str = "user not found";
    pub const PSEUDO_ALREADY_TAKEN: &str = "pseudo already taken";
    pub const EMAIL_ALREADY_REGISTERED: &str = "email already registered";
    pub const NOT_FRIENDS: &str = "users are not friends";
    pub const ALREADY_FRIENDS: &str = "users are already friends";
    pub const REQUEST_ALREADY_SENT: &str = "friend request already sent";
    pub const REQUEST_NOT_FOUND: &str = "friend request not found";
    pub const NOT_REQUEST_RECEIVER: &str = "not the receiver of this request";
    pub const REQUEST_RESOLVED: &str = "friend request already resolved";
    pub const GROUP_NOT_FOUND: &str = "group not found";
    pub const NOT_GROUP_MEMBER: &str = "user is not a group member";
    pub const ALREADY_GROUP_MEMBER: &str = "user is already a group member";
    pub const NOT_GROUP_OWNER: &str = "only the group owner may do this";
    pub const NOT_GROUP_ADMIN: &str = "only a group admin may do this";
    pub const GROUP_IS_PRIVATE: &str = "group is private";
    pub const OWNER_CANNOT_LEAVE: &str = "the owner cannot leave their own group";
    pub const INVITATION_NOT_FOUND: &str = "invitation not found";
    pub const INVITATION_ALREADY_SENT: &str = "invitation already sent";
    pub const INVITATION_RESOLVED: &str = "invitation already resolved";
    pub const MESSAGE_TARGET_INVALID: &str = "message must target a friend or a group";
    pub const UNDERAGE: &str = "you must be 13 or older";
    pub const VALIDATION_FAILED: &str = "validation failed";
    pub const INTERNAL_ERROR: &str = "internal error";
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use application::ApplicationError as AppErr;
        use domain::DomainError;

        match error {
            AppErr::Domain(DomainError::InvalidArgument { field, reason }) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_ARGUMENT",
                format!("{}: {}: {}", catalog::VALIDATION_FAILED, field, reason),
            ),
            AppErr::Domain(DomainError::Underage) => {
                ApiError::new(StatusCode::BAD_REQUEST, "UNDERAGE", catalog::UNDERAGE)
            }
            AppErr::Domain(DomainError::UserNotFound) => ApiError::new(
                StatusCode::NOT_FOUND,
                "USER_NOT_FOUND",
                catalog::USER_NOT_FOUND,
            ),
            AppErr::Domain(DomainError::PseudoAlreadyTaken) => ApiError::new(
                StatusCode::CONFLICT,
                "PSEUDO_TAKEN",
                catalog::PSEUDO_ALREADY_TAKEN,
            ),
            AppErr::Domain(DomainError::EmailAlreadyRegistered) => ApiError::new(
                StatusCode::CONFLICT,
                "EMAIL_REGISTERED",
                catalog::EMAIL_ALREADY_REGISTERED,
            ),
            AppErr::Domain(DomainError::NotFriends) => {
                ApiError::new(StatusCode::FORBIDDEN, "NOT_FRIENDS", catalog::NOT_FRIENDS)
            }
            AppErr::Domain(DomainError::AlreadyFriends) => ApiError::new(
                StatusCode::CONFLICT,
                "ALREADY_FRIENDS",
                catalog::ALREADY_FRIENDS,
            ),
            AppErr::Domain(DomainError::FriendRequestAlreadySent) => ApiError::new(
                StatusCode::CONFLICT,
                "REQUEST_ALREADY_SENT",
                catalog::REQUEST_ALREADY_SENT,
            ),
            AppErr::Domain(DomainError::FriendRequestNotFound) => ApiError::new(
                StatusCode::NOT_FOUND,
                "REQUEST_NOT_FOUND",
                catalog::REQUEST_NOT_FOUND,
            ),
            AppErr::Domain(DomainError::NotRequestReceiver) => ApiError::new(
                StatusCode::FORBIDDEN,
                "NOT_REQUEST_RECEIVER",
                catalog::NOT_REQUEST_RECEIVER,
            ),
            AppErr::Domain(DomainError::FriendRequestResolved) => ApiError::new(
                StatusCode::CONFLICT,
                "REQUEST_RESOLVED",
                catalog::REQUEST_RESOLVED,
            ),
            AppErr::Domain(DomainError::GroupNotFound) => ApiError::new(
                StatusCode::NOT_FOUND,
                "GROUP_NOT_FOUND",
                catalog::GROUP_NOT_FOUND,
            ),
            AppErr::Domain(DomainError::NotGroupMember) => ApiError::new(
                StatusCode::FORBIDDEN,
                "NOT_GROUP_MEMBER",
                catalog::NOT_GROUP_MEMBER,
            ),
            AppErr::Domain(DomainError::AlreadyGroupMember) => ApiError::new(
                StatusCode::CONFLICT,
                "MEMBERSHIP_EXISTS",
                catalog::ALREADY_GROUP_MEMBER,
            ),
            AppErr::Domain(DomainError::NotGroupOwner) => ApiError::new(
                StatusCode::FORBIDDEN,
                "NOT_GROUP_OWNER",
                catalog::NOT_GROUP_OWNER,
            ),
            AppErr::Domain(DomainError::NotGroupAdmin) => ApiError::new(
                StatusCode::FORBIDDEN,
                "NOT_GROUP_ADMIN",
                catalog::NOT_GROUP_ADMIN,
            ),
            AppErr::Domain(DomainError::GroupIsPrivate) => ApiError::new(
                StatusCode::FORBIDDEN,
                "GROUP_PRIVATE",
                catalog::GROUP_IS_PRIVATE,
            ),
            AppErr::Domain(DomainError::OwnerCannotLeave) => ApiError::new(
                StatusCode::FORBIDDEN,
                "OWNER_CANNOT_LEAVE",
                catalog::OWNER_CANNOT_LEAVE,
            ),
            AppErr::Domain(DomainError::InvitationNotFound) => ApiError::new(
                StatusCode::NOT_FOUND,
                "INVITATION_NOT_FOUND",
                catalog::INVITATION_NOT_FOUND,
            ),
            AppErr::Domain(DomainError::InvitationAlreadySent) => ApiError::new(
                StatusCode::CONFLICT,
                "INVITATION_ALREADY_SENT",
                catalog::INVITATION_ALREADY_SENT,
            ),
            AppErr::Domain(DomainError::InvitationResolved) => ApiError::new(
                StatusCode::CONFLICT,
                "INVITATION_RESOLVED",
                catalog::INVITATION_RESOLVED,
            ),
            AppErr::Domain(DomainError::InvalidMessageTarget) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_MESSAGE_TARGET",
                catalog::MESSAGE_TARGET_INVALID,
            ),
            AppErr::Repository(repo_err) => match repo_err {
                domain::RepositoryError::NotFound => ApiError::new(
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "requested resource not found",
                ),
                domain::RepositoryError::Conflict => {
                    ApiError::new(StatusCode::CONFLICT, "CONFLICT", "resource already exists")
                }
                domain::RepositoryError::Storage { message } => {
                    tracing::error!(error = %message, "repository failure");
                    ApiError::new(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "DATABASE_ERROR",
                        catalog::INTERNAL_ERROR,
                    )
                }
            },
            AppErr::Password(err) => {
                tracing::error!(error = %err, "password hasher failure");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PASSWORD_ERROR",
                    catalog::INTERNAL_ERROR,
                )
            }
            AppErr::FileStore(err) => {
                tracing::error!(error = %err, "file store failure");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "FILE_STORE_ERROR",
                    catalog::INTERNAL_ERROR,
                )
            }
            AppErr::Authentication => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "AUTHENTICATION_FAILED",
                catalog::INVALID_CREDENTIALS,
            ),
            AppErr::Authorization => ApiError::new(
                StatusCode::FORBIDDEN,
                "AUTHORIZATION_FAILED",
                "authorization failed",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::DomainError;

    #[test]
    fn domain_errors_map_to_stable_statuses() {
        let cases = [
            (DomainError::UserNotFound, StatusCode::NOT_FOUND),
            (DomainError::PseudoAlreadyTaken, StatusCode::CONFLICT),
            (DomainError::NotFriends, StatusCode::FORBIDDEN),
            (DomainError::GroupIsPrivate, StatusCode::FORBIDDEN),
            (DomainError::InvalidMessageTarget, StatusCode::BAD_REQUEST),
        ];
        for (error, expected) in cases {
            let api: ApiError = ApplicationError::from(error).into();
            assert_eq!(api.status, expected);
        }
    }

    #[test]
    fn authentication_uses_the_shared_credentials_message() {
        let api: ApiError = ApplicationError::Authentication.into();
        assert_eq!(api.status, StatusCode::UNAUTHORIZED);
        assert_eq!(api.body.message, catalog::INVALID_CREDENTIALS);
    }
}
