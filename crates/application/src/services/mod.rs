//! 用例服务。每个服务通过 `XServiceDependencies` 显式接收适配器，
//! 不依赖全局状态。

mod auth_service;
mod friend_service;
mod group_service;
mod message_service;
mod search_service;
mod user_service;

pub use auth_service::{AuthService, AuthServiceDependencies, LoginRequest, SignupRequest};
pub use friend_service::{FriendService, FriendServiceDependencies};
pub use group_service::{
    CreateGroupRequest, GroupService, GroupServiceDependencies, UpdateGroupRequest,
};
pub use message_service::{
    AttachmentUpload, MessageService, MessageServiceDependencies, SendMessageRequest,
};
pub use search_service::{SearchService, SearchServiceDependencies};
pub use user_service::{UserService, UserServiceDependencies};
