use domain::UserStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dto::UserProfileDto;

/// 客户端入站信号。封闭的带标签枚举，新增信号种类必须在这里声明，
/// 分发时做穷尽匹配。未知的 `type` 会在反序列化时失败并被丢弃。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientSignal {
    /// 绑定连接。凭证在握手之外单独提交。
    #[serde(rename_all = "camelCase")]
    Join { token: String },

    /// 加入群组频道。业务授权由 REST 层负责，这里信任调用方。
    #[serde(rename_all = "camelCase")]
    JoinGroup { group_id: Uuid },

    /// 离开群组频道。幂等。
    #[serde(rename_all = "camelCase")]
    LeaveGroup { group_id: Uuid },

    #[serde(rename_all = "camelCase")]
    AvatarUpdated { avatar_url: String },

    /// 好友请求被接受后由接受方通知新好友。
    #[serde(rename_all = "camelCase")]
    FriendAdded { friend_id: Uuid },

    #[serde(rename_all = "camelCase")]
    FriendDeleted { friend_id: Uuid },

    #[serde(rename_all = "camelCase")]
    PseudoChanged { pseudo: String },

    /// 状态变化。带 `targetId` 时只投递给目标用户的个人频道；
    /// 不带时视为自报状态：先写入存储，再广播给所有好友。
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        status: UserStatus,
        target_id: Option<Uuid>,
    },

    #[serde(rename_all = "camelCase")]
    PrivateMessage {
        receiver_id: Uuid,
        message: serde_json::Value,
    },

    #[serde(rename_all = "camelCase")]
    GroupMessage {
        group_id: Uuid,
        message: serde_json::Value,
    },

    #[serde(rename_all = "camelCase")]
    StartTypingPrivate { contact_id: Uuid },

    #[serde(rename_all = "camelCase")]
    StopTypingPrivate { contact_id: Uuid },

    #[serde(rename_all = "camelCase")]
    StartTyping { group_id: Uuid },

    #[serde(rename_all = "camelCase")]
    StopTyping { group_id: Uuid },
}

/// 服务端出站事件。序列化为 `{"event": ..., "data": ...}`。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    StatusChanged { user_id: Uuid, status: UserStatus },

    #[serde(rename_all = "camelCase")]
    AvatarUpdated { user_id: Uuid, avatar_url: String },

    #[serde(rename_all = "camelCase")]
    FriendAdded { new_friend: UserProfileDto },

    #[serde(rename_all = "camelCase")]
    FriendDeleted { user_id: Uuid },

    #[serde(rename_all = "camelCase")]
    PseudoChanged { user_id: Uuid, pseudo: String },

    PrivateMessageReceived(serde_json::Value),

    GroupMessageReceived(serde_json::Value),

    #[serde(rename_all = "camelCase")]
    StartTypingPrivate { user_id: Uuid },

    #[serde(rename_all = "camelCase")]
    StopTypingPrivate { user_id: Uuid },

    #[serde(rename_all = "camelCase")]
    StartTyping { user_id: Uuid },

    #[serde(rename_all = "camelCase")]
    StopTyping { user_id: Uuid },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_signal_deserializes() {
        let signal: ClientSignal =
            serde_json::from_str(r#"{"type": "join", "token": "abc"}"#).unwrap();
        assert_eq!(
            signal,
            ClientSignal::Join {
                token: "abc".to_owned()
            }
        );
    }

    #[test]
    fn unknown_signal_type_is_rejected() {
        let result = serde_json::from_str::<ClientSignal>(r#"{"type": "selfDestruct"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn status_changed_event_uses_wire_names() {
        let event = ServerEvent::StatusChanged {
            user_id: Uuid::nil(),
            status: UserStatus::Online,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "statusChanged");
        assert_eq!(json["data"]["status"], "ONLINE");
        assert!(json["data"]["userId"].is_string());
    }

    #[test]
    fn message_events_carry_the_raw_body() {
        let body = serde_json::json!({"content": "hi", "senderId": "x"});
        let event = ServerEvent::PrivateMessageReceived(body.clone());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "privateMessageReceived");
        assert_eq!(json["data"], body);
    }
}
