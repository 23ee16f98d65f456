//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务，处理输入校验、事务边界、
//! 以及对外部适配器（密码哈希、凭证解析、文件存储）的抽象。
//! 实时在线状态与事件分发引擎也位于此层（`realtime` 模块）。

pub mod clock;
pub mod dto;
pub mod error;
pub mod file_store;
pub mod identity;
pub mod memory;
pub mod password;
pub mod realtime;
pub mod repository;
pub mod services;

pub use clock::{Clock, FixedClock, SystemClock};
pub use dto::{
    FileDto, FriendRequestDto, GroupDto, GroupMemberDto, GroupRequestDto, MessageDto, UserDto,
    UserProfileDto,
};
pub use error::ApplicationError;
pub use file_store::{FileStore, FileStoreError, StoredUpload};
pub use identity::{IdentityError, IdentityResolver};
pub use password::{PasswordHasher, PasswordHasherError};
pub use realtime::{
    ClientSignal, ConnectionId, ConnectionRegistry, EventSender, FanoutEngine,
    FanoutEngineDependencies, ServerEvent,
};
pub use repository::{
    FileRepository, FriendRequestRepository, GroupMembershipRepository, GroupRepository,
    GroupRequestRepository, MessageRepository, UserRepository,
};
pub use services::{
    AttachmentUpload, AuthService, AuthServiceDependencies, CreateGroupRequest, FriendService,
    FriendServiceDependencies, GroupService, GroupServiceDependencies, LoginRequest,
    MessageService, MessageServiceDependencies, SearchService, SearchServiceDependencies,
    SendMessageRequest, SignupRequest, UpdateGroupRequest, UserService, UserServiceDependencies,
};
