use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entities::message::MessageKind;
use crate::errors::DomainError;

/// 两个用户之间唯一的会话记录
///
/// 参与者按规范顺序存储（uuid 字节序较小者在前），保证无论从哪个
/// 方向查询，{A,B} 都解析到同一行。last_* 字段是最近一条消息的
/// 写穿缓存，消息历史的权威数据仍在消息表。
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Talk {
    pub id: Uuid,
    pub user_low: Uuid,
    pub user_high: Uuid,
    pub last_content: Option<String>,
    pub last_kind: Option<MessageKind>,
    pub last_time: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Talk {
    /// 规范化无序用户对：字节序较小的 uuid 在前
    pub fn canonical_pair(user_a: Uuid, user_b: Uuid) -> (Uuid, Uuid) {
        if user_a <= user_b {
            (user_a, user_b)
        } else {
            (user_b, user_a)
        }
    }

    /// 用户是否为会话参与者
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.user_low == user_id || self.user_high == user_id
    }

    /// 给定一方，返回会话中的另一方
    pub fn peer_of(&self, user_id: Uuid) -> Result<Uuid, DomainError> {
        if user_id == self.user_low {
            Ok(self.user_high)
        } else if user_id == self.user_high {
            Ok(self.user_low)
        } else {
            Err(DomainError::permission_denied("不是会话参与者"))
        }
    }
}

/// 单个参与者在某个会话上的设置
///
/// 置顶与免打扰各自独立，互不影响对方一侧。
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TalkSetting {
    pub talk_id: Uuid,
    pub user_id: Uuid,
    pub pinned: bool,
    pub disabled: bool,
}

impl TalkSetting {
    /// 尚未写入任何设置时的默认值：未置顶、未禁用
    pub fn default_for(talk_id: Uuid, user_id: Uuid) -> Self {
        Self {
            talk_id,
            user_id,
            pinned: false,
            disabled: false,
        }
    }
}
