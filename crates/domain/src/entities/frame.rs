//! WebSocket 协议帧
//!
//! 入站帧以 operationType 区分，出站帧以 messageResultType 区分。
//! 两端都是封闭的 tagged enum：新增操作是编译期检查的改动，
//! 路由层对所有变体做穷尽匹配。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::message::{Message, MessageKind};
use crate::entities::talk::{Talk, TalkSetting};
use crate::entities::user::UserProfile;

/// 客户端入站操作
///
/// 每个入站帧是一次原子请求，帧之间不保留操作级状态。
/// 缺失的字段解析为 None，由路由层做参数校验。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operationType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientFrame {
    /// 心跳，不触达存储
    Ping,
    /// 发送消息
    #[serde(rename_all = "camelCase")]
    Message {
        to: Option<Uuid>,
        content: Option<String>,
        #[serde(default)]
        message_type: Option<MessageKind>,
        #[serde(default)]
        talk_id: Option<Uuid>,
    },
    /// 将某个会话中发给自己的消息全部标记已读
    #[serde(rename_all = "camelCase")]
    Read { talk_id: Option<Uuid> },
    /// 拉取自己的全部未读消息
    Unread,
    /// 拉取与某用户的历史消息
    History { to: Option<Uuid> },
}

/// 服务端出站帧
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "messageResultType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerFrame {
    /// 心跳应答，data 为服务器毫秒时间戳
    Pong { data: i64 },
    /// 新消息推送（发给接收方）或发送回执（发给发送方）
    Message {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<MessageView>,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<SendReceipt>,
    },
    /// 未读消息列表，最新的在前
    UnRead { data: Vec<MessageView> },
    /// 历史消息，按时间正序
    History { data: Vec<MessageView> },
    /// 已读确认
    Read { result: ReadReceipt },
    /// 账号在其他地方登录，当前连接即将被关闭
    Offline { error: String },
    /// 操作级错误，连接保持打开
    Error { error: String },
}

impl ServerFrame {
    pub fn pong(now: DateTime<Utc>) -> Self {
        ServerFrame::Pong {
            data: now.timestamp_millis(),
        }
    }

    /// 推送给接收方的新消息帧
    pub fn push(view: MessageView) -> Self {
        ServerFrame::Message {
            data: Some(view),
            result: None,
        }
    }

    /// 发送方的发送回执帧
    pub fn sent(message_id: i64, talk_id: Uuid) -> Self {
        ServerFrame::Message {
            data: None,
            result: Some(SendReceipt {
                status: "sent".to_string(),
                message_id,
                talk_id,
            }),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            error: message.into(),
        }
    }

    pub fn offline(message: impl Into<String>) -> Self {
        ServerFrame::Offline {
            error: message.into(),
        }
    }
}

/// 发送回执
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub status: String,
    pub message_id: i64,
    pub talk_id: Uuid,
}

/// 已读确认
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub talk_id: Uuid,
    /// 本次被置为已读的消息条数
    pub updated: u64,
}

/// 带发送者展示信息的消息视图
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: i64,
    pub talk_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
    pub message_type: MessageKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_avatar: Option<String>,
}

impl MessageView {
    /// 未装饰的消息视图
    pub fn from_message(message: Message) -> Self {
        Self {
            id: message.id,
            talk_id: message.talk_id,
            sender_id: message.sender_id,
            recipient_id: message.recipient_id,
            content: message.content,
            message_type: message.kind,
            is_read: message.is_read,
            created_at: message.created_at,
            sender_name: None,
            sender_avatar: None,
        }
    }

    /// 附加发送者展示信息
    pub fn decorated(message: Message, sender: Option<&UserProfile>) -> Self {
        let mut view = Self::from_message(message);
        if let Some(profile) = sender {
            view.sender_name = Some(profile.display_name.clone());
            view.sender_avatar = profile.avatar_url.clone();
        }
        view
    }
}

/// 会话列表条目：会话 + 对端展示信息 + 自己一侧的设置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TalkView {
    pub talk_id: Uuid,
    pub peer_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_avatar: Option<String>,
    pub last_content: Option<String>,
    pub last_kind: Option<MessageKind>,
    pub last_time: Option<DateTime<Utc>>,
    pub pinned: bool,
}

impl TalkView {
    pub fn new(
        talk: &Talk,
        peer_id: Uuid,
        peer: Option<&UserProfile>,
        setting: &TalkSetting,
    ) -> Self {
        Self {
            talk_id: talk.id,
            peer_id,
            peer_name: peer.map(|p| p.display_name.clone()),
            peer_avatar: peer.and_then(|p| p.avatar_url.clone()),
            last_content: talk.last_content.clone(),
            last_kind: talk.last_kind,
            last_time: talk.last_time,
            pinned: setting.pinned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frame_parses_message_operation() {
        let raw = r#"{"operationType":"MESSAGE","to":"0191f9a0-0000-7000-8000-000000000001","content":"hi","messageType":"GOODS"}"#;
        let frame: ClientFrame = serde_json::from_str(raw).unwrap();
        match frame {
            ClientFrame::Message {
                to,
                content,
                message_type,
                talk_id,
            } => {
                assert!(to.is_some());
                assert_eq!(content.as_deref(), Some("hi"));
                assert_eq!(message_type, Some(MessageKind::Goods));
                assert!(talk_id.is_none());
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn client_frame_rejects_unknown_operation() {
        let raw = r#"{"operationType":"DANCE"}"#;
        assert!(serde_json::from_str::<ClientFrame>(raw).is_err());
    }

    #[test]
    fn server_frame_uses_wire_tags() {
        let unread = serde_json::to_value(ServerFrame::UnRead { data: vec![] }).unwrap();
        assert_eq!(unread["messageResultType"], "UN_READ");

        let sent = serde_json::to_value(ServerFrame::sent(7, Uuid::new_v4())).unwrap();
        assert_eq!(sent["messageResultType"], "MESSAGE");
        assert_eq!(sent["result"]["status"], "sent");
        assert_eq!(sent["result"]["messageId"], 7);

        let offline = serde_json::to_value(ServerFrame::offline("elsewhere")).unwrap();
        assert_eq!(offline["messageResultType"], "OFFLINE");
    }
}
