use std::sync::Arc;

use domain::{GroupId, UserId, UserStatus};
use uuid::Uuid;

use crate::identity::IdentityResolver;
use crate::repository::UserRepository;

use super::registry::{ConnectionId, ConnectionRegistry, EventSender};
use super::signal::{ClientSignal, ServerEvent};

pub struct FanoutEngineDependencies {
    pub identity_resolver: Arc<dyn IdentityResolver>,
    pub users: Arc<dyn UserRepository>,
}

/// 在线状态与事件分发引擎。
///
/// 每个实时服务进程构造一个实例，由 WebSocket 层显式传入每次信号处理。
/// 存储操作失败一律记录日志并丢弃该信号，连接保持存活。
pub struct FanoutEngine {
    registry: ConnectionRegistry,
    deps: FanoutEngineDependencies,
}

impl FanoutEngine {
    pub fn new(deps: FanoutEngineDependencies) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            deps,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// 传输层在连接升级后调用，登记该连接的事件发送端。
    pub async fn register_connection(&self, id: ConnectionId, sender: EventSender) {
        self.registry.register(id, sender).await;
        tracing::debug!(connection_id = %id, "connection registered");
    }

    /// 处理一条入站信号。未绑定的连接只允许 `join`，
    /// 其余信号静默忽略，绝不让连接崩溃。
    pub async fn handle_signal(&self, id: ConnectionId, signal: ClientSignal) {
        if let ClientSignal::Join { token } = signal {
            self.handle_join(id, &token).await;
            return;
        }

        let Some(user_id) = self.registry.bound_user(id).await else {
            tracing::debug!(connection_id = %id, "signal from unauthenticated connection ignored");
            return;
        };

        match signal {
            ClientSignal::Join { .. } => unreachable!("handled above"),
            ClientSignal::JoinGroup { group_id } => {
                self.registry.join_group(id, GroupId::from(group_id)).await;
            }
            ClientSignal::LeaveGroup { group_id } => {
                self.registry.leave_group(id, GroupId::from(group_id)).await;
            }
            ClientSignal::AvatarUpdated { avatar_url } => {
                self.broadcast_to_friends(
                    user_id,
                    &ServerEvent::AvatarUpdated {
                        user_id: Uuid::from(user_id),
                        avatar_url,
                    },
                )
                .await;
            }
            ClientSignal::FriendAdded { friend_id } => {
                self.handle_friend_added(user_id, UserId::from(friend_id)).await;
            }
            ClientSignal::FriendDeleted { friend_id } => {
                self.registry
                    .emit_to_user(
                        UserId::from(friend_id),
                        &ServerEvent::FriendDeleted {
                            user_id: Uuid::from(user_id),
                        },
                    )
                    .await;
            }
            ClientSignal::PseudoChanged { pseudo } => {
                let event = ServerEvent::PseudoChanged {
                    user_id: Uuid::from(user_id),
                    pseudo,
                };
                self.broadcast_to_friends(user_id, &event).await;
                self.registry.emit_to_user(user_id, &event).await;
            }
            ClientSignal::StatusChanged { status, target_id } => match target_id {
                Some(target) => {
                    self.registry
                        .emit_to_user(
                            UserId::from(target),
                            &ServerEvent::StatusChanged {
                                user_id: Uuid::from(user_id),
                                status,
                            },
                        )
                        .await;
                }
                None => self.report_status(user_id, status).await,
            },
            ClientSignal::PrivateMessage {
                receiver_id,
                message,
            } => {
                self.registry
                    .emit_to_user(
                        UserId::from(receiver_id),
                        &ServerEvent::PrivateMessageReceived(message),
                    )
                    .await;
            }
            ClientSignal::GroupMessage { group_id, message } => {
                self.registry
                    .emit_to_group(
                        GroupId::from(group_id),
                        &ServerEvent::GroupMessageReceived(message),
                    )
                    .await;
            }
            ClientSignal::StartTypingPrivate { contact_id } => {
                self.registry
                    .emit_to_user(
                        UserId::from(contact_id),
                        &ServerEvent::StartTypingPrivate {
                            user_id: Uuid::from(user_id),
                        },
                    )
                    .await;
            }
            ClientSignal::StopTypingPrivate { contact_id } => {
                self.registry
                    .emit_to_user(
                        UserId::from(contact_id),
                        &ServerEvent::StopTypingPrivate {
                            user_id: Uuid::from(user_id),
                        },
                    )
                    .await;
            }
            ClientSignal::StartTyping { group_id } => {
                self.registry
                    .emit_to_group(
                        GroupId::from(group_id),
                        &ServerEvent::StartTyping {
                            user_id: Uuid::from(user_id),
                        },
                    )
                    .await;
            }
            ClientSignal::StopTyping { group_id } => {
                self.registry
                    .emit_to_group(
                        GroupId::from(group_id),
                        &ServerEvent::StopTyping {
                            user_id: Uuid::from(user_id),
                        },
                    )
                    .await;
            }
        }
    }

    /// 连接终止。无论传输层触发多少次，清理只发生一次。
    pub async fn handle_disconnect(&self, id: ConnectionId) {
        let Some(removed) = self.registry.remove(id).await else {
            return;
        };
        let Some(user_id) = removed.bound_user else {
            tracing::debug!(connection_id = %id, "unauthenticated connection closed");
            return;
        };

        if let Err(err) = self.deps.users.set_status(user_id, UserStatus::Offline).await {
            tracing::error!(user_id = %user_id, error = %err, "failed to persist offline status");
        }
        self.broadcast_to_friends(
            user_id,
            &ServerEvent::StatusChanged {
                user_id: Uuid::from(user_id),
                status: UserStatus::Offline,
            },
        )
        .await;
        tracing::info!(connection_id = %id, user_id = %user_id, "connection closed");
    }

    async fn handle_join(&self, id: ConnectionId, token: &str) {
        if self.registry.bound_user(id).await.is_some() {
            tracing::debug!(connection_id = %id, "connection already bound, join ignored");
            return;
        }

        // 凭证无效不致命：记录日志，连接保持未认证状态
        let user_id = match self.deps.identity_resolver.verify(token).await {
            Ok(user_id) => user_id,
            Err(err) => {
                tracing::warn!(connection_id = %id, error = %err, "realtime authentication failed");
                return;
            }
        };

        if !self.registry.bind(id, user_id).await {
            return;
        }
        tracing::info!(connection_id = %id, user_id = %user_id, "connection bound");

        if let Err(err) = self.deps.users.set_status(user_id, UserStatus::Online).await {
            tracing::error!(user_id = %user_id, error = %err, "failed to persist online status");
        }
        self.broadcast_to_friends(
            user_id,
            &ServerEvent::StatusChanged {
                user_id: Uuid::from(user_id),
                status: UserStatus::Online,
            },
        )
        .await;
    }

    async fn handle_friend_added(&self, user_id: UserId, friend_id: UserId) {
        let profile = match self.deps.users.find_by_id(user_id).await {
            Ok(Some(user)) => crate::dto::UserProfileDto::from(&user),
            Ok(None) => {
                tracing::warn!(user_id = %user_id, "bound user no longer exists");
                return;
            }
            Err(err) => {
                tracing::error!(user_id = %user_id, error = %err, "failed to load profile");
                return;
            }
        };
        self.registry
            .emit_to_user(friend_id, &ServerEvent::FriendAdded { new_friend: profile })
            .await;
    }

    async fn report_status(&self, user_id: UserId, status: UserStatus) {
        if let Err(err) = self.deps.users.set_status(user_id, status).await {
            tracing::error!(user_id = %user_id, error = %err, "failed to persist status");
            return;
        }
        self.broadcast_to_friends(
            user_id,
            &ServerEvent::StatusChanged {
                user_id: Uuid::from(user_id),
                status,
            },
        )
        .await;
    }

    /// 好友集合在每次广播时从关系存储重新解析，绝不缓存在连接上。
    async fn broadcast_to_friends(&self, user_id: UserId, event: &ServerEvent) {
        let friends = match self.deps.users.get_friend_ids(user_id).await {
            Ok(friends) => friends,
            Err(err) => {
                tracing::error!(user_id = %user_id, error = %err, "failed to resolve friends");
                return;
            }
        };
        for friend_id in friends {
            self.registry.emit_to_user(friend_id, event).await;
        }
    }
}
