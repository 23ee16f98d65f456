use std::collections::{HashMap, HashSet};
use std::fmt;

use domain::{GroupId, UserId};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::signal::ServerEvent;

/// 连接唯一标识，由传输层在升级时分配。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

struct Connection {
    sender: EventSender,
    bound_user: Option<UserId>,
    joined_groups: HashSet<GroupId>,
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<ConnectionId, Connection>,
    // 个人频道：用户 → 绑定到该用户的连接集合
    user_index: HashMap<UserId, HashSet<ConnectionId>>,
    // 群组频道：群组 → 已加入的连接集合
    group_index: HashMap<GroupId, HashSet<ConnectionId>>,
}

/// 连接路由表。每个服务进程持有一份，通过引用传入信号处理路径，
/// 只在 bind / join / leave / disconnect 时变更。
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
}

/// 连接移除后遗留的清理信息。
pub(super) struct RemovedConnection {
    pub bound_user: Option<UserId>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册新连接。此时尚未绑定用户，不属于任何频道。
    pub async fn register(&self, id: ConnectionId, sender: EventSender) {
        let mut inner = self.inner.write().await;
        inner.connections.insert(
            id,
            Connection {
                sender,
                bound_user: None,
                joined_groups: HashSet::new(),
            },
        );
    }

    /// 把连接绑定到已验证的用户身份，并加入其个人频道。
    /// 返回 false 表示连接已不存在（并发断开）。
    pub async fn bind(&self, id: ConnectionId, user_id: UserId) -> bool {
        let mut inner = self.inner.write().await;
        let Some(connection) = inner.connections.get_mut(&id) else {
            return false;
        };
        connection.bound_user = Some(user_id);
        inner.user_index.entry(user_id).or_default().insert(id);
        true
    }

    pub async fn bound_user(&self, id: ConnectionId) -> Option<UserId> {
        let inner = self.inner.read().await;
        inner.connections.get(&id).and_then(|c| c.bound_user)
    }

    /// 加入群组频道。幂等；未绑定的连接不能加入任何频道。
    pub async fn join_group(&self, id: ConnectionId, group_id: GroupId) -> bool {
        let mut inner = self.inner.write().await;
        let Some(connection) = inner.connections.get_mut(&id) else {
            return false;
        };
        if connection.bound_user.is_none() {
            return false;
        }
        connection.joined_groups.insert(group_id);
        inner.group_index.entry(group_id).or_default().insert(id);
        true
    }

    /// 离开群组频道。对未加入的频道是 no-op。
    pub async fn leave_group(&self, id: ConnectionId, group_id: GroupId) {
        let mut inner = self.inner.write().await;
        if let Some(connection) = inner.connections.get_mut(&id) {
            connection.joined_groups.remove(&group_id);
        }
        if let Some(members) = inner.group_index.get_mut(&group_id) {
            members.remove(&id);
            if members.is_empty() {
                inner.group_index.remove(&group_id);
            }
        }
    }

    /// 移除连接并返回清理信息。重复调用返回 None，
    /// 这是断开清理恰好执行一次的保证。
    pub(super) async fn remove(&self, id: ConnectionId) -> Option<RemovedConnection> {
        let mut inner = self.inner.write().await;
        let connection = inner.connections.remove(&id)?;

        if let Some(user_id) = connection.bound_user {
            if let Some(conns) = inner.user_index.get_mut(&user_id) {
                conns.remove(&id);
                if conns.is_empty() {
                    inner.user_index.remove(&user_id);
                }
            }
        }
        for group_id in &connection.joined_groups {
            if let Some(members) = inner.group_index.get_mut(group_id) {
                members.remove(&id);
                if members.is_empty() {
                    inner.group_index.remove(group_id);
                }
            }
        }

        Some(RemovedConnection {
            bound_user: connection.bound_user,
        })
    }

    /// 向某个用户的个人频道发送事件（该用户的全部连接）。
    pub async fn emit_to_user(&self, user_id: UserId, event: &ServerEvent) {
        let inner = self.inner.read().await;
        let Some(conns) = inner.user_index.get(&user_id) else {
            return;
        };
        for conn_id in conns {
            if let Some(connection) = inner.connections.get(conn_id) {
                // 接收端已关闭时发送失败，由断开清理收尾
                let _ = connection.sender.send(event.clone());
            }
        }
    }

    /// 向群组频道发送事件。
    pub async fn emit_to_group(&self, group_id: GroupId, event: &ServerEvent) {
        let inner = self.inner.read().await;
        let Some(members) = inner.group_index.get(&group_id) else {
            return;
        };
        for conn_id in members {
            if let Some(connection) = inner.connections.get(conn_id) {
                let _ = connection.sender.send(event.clone());
            }
        }
    }

    #[cfg(test)]
    pub(super) async fn group_member_count(&self, group_id: GroupId) -> usize {
        let inner = self.inner.read().await;
        inner
            .group_index
            .get(&group_id)
            .map(|m| m.len())
            .unwrap_or(0)
    }
}
