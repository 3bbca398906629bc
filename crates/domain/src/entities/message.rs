use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::DomainError;

/// 消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Text,
    Image,
    Voice,
    Goods,
    Order,
    Video,
    File,
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Voice => "voice",
            MessageKind::Goods => "goods",
            MessageKind::Order => "order",
            MessageKind::Video => "video",
            MessageKind::File => "file",
            MessageKind::System => "system",
        }
    }

    pub fn from_str_or_text(value: &str) -> Self {
        match value {
            "image" => MessageKind::Image,
            "voice" => MessageKind::Voice,
            "goods" => MessageKind::Goods,
            "order" => MessageKind::Order,
            "video" => MessageKind::Video,
            "file" => MessageKind::File,
            "system" => MessageKind::System,
            _ => MessageKind::Text,
        }
    }
}

/// 待持久化的新消息
///
/// id 与时间戳由存储层生成，追加写入后得到完整的 [`Message`]。
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub talk_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
    pub kind: MessageKind,
}

impl NewMessage {
    /// 构造新消息，校验发送方与接收方不同且内容非空
    pub fn new(
        talk_id: Uuid,
        sender_id: Uuid,
        recipient_id: Uuid,
        content: impl Into<String>,
        kind: MessageKind,
    ) -> Result<Self, DomainError> {
        let content = content.into();
        if sender_id == recipient_id {
            return Err(DomainError::validation_error(
                "recipient_id",
                "不能给自己发送消息",
            ));
        }
        if content.trim().is_empty() {
            return Err(DomainError::validation_error("content", "消息内容不能为空"));
        }
        Ok(Self {
            talk_id,
            sender_id,
            recipient_id,
            content,
            kind,
        })
    }
}

/// 一条定向聊天消息
///
/// id 单调递增，与 created_at 一起构成全序（时间戳相同以 id 决胜）。
/// 已读标记只能由接收方设置；软删除后不再出现在历史与未读查询中。
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub id: i64,
    pub talk_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
    pub kind: MessageKind,
    pub is_read: bool,
    #[serde(skip_serializing, default)] // 删除标记不暴露给客户端
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// 接收方将消息标记为已读
    pub fn mark_read(&mut self, reader_id: Uuid) -> Result<(), DomainError> {
        if reader_id != self.recipient_id {
            return Err(DomainError::permission_denied("只有接收方可以标记已读"));
        }
        self.is_read = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_rejects_self_send() {
        let user = Uuid::new_v4();
        let result = NewMessage::new(Uuid::new_v4(), user, user, "hi", MessageKind::Text);
        assert!(matches!(
            result,
            Err(DomainError::ValidationError { .. })
        ));
    }

    #[test]
    fn new_message_rejects_blank_content() {
        let result = NewMessage::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "   ",
            MessageKind::Text,
        );
        assert!(matches!(
            result,
            Err(DomainError::ValidationError { .. })
        ));
    }

    #[test]
    fn only_recipient_can_mark_read() {
        let sender = Uuid::new_v4();
        let recipient = Uuid::new_v4();
        let mut message = Message {
            id: 1,
            talk_id: Uuid::new_v4(),
            sender_id: sender,
            recipient_id: recipient,
            content: "hello".to_string(),
            kind: MessageKind::Text,
            is_read: false,
            is_deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(message.mark_read(sender).is_err());
        assert!(!message.is_read);
        assert!(message.mark_read(recipient).is_ok());
        assert!(message.is_read);
    }
}
