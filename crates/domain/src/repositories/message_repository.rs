//! 消息存储接口
//!
//! 持久化的追加型消息日志及其读取查询。所有 "最新在前" 的排序
//! 以 created_at 为主键、持久 id 决胜，时间戳相同时依然全序。

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::message::{Message, NewMessage};
use crate::errors::DomainResult;

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 追加一条消息，纯插入，从不更新已有行
    async fn append(&self, message: NewMessage) -> DomainResult<Message>;

    /// 按 id 查找（包含软删除行，权限判断需要原始状态）
    async fn find_by_id(&self, message_id: i64) -> DomainResult<Option<Message>>;

    /// 批量将会话内发给 recipient 的未读消息置为已读，返回影响行数；幂等
    async fn mark_read(&self, talk_id: Uuid, recipient_id: Uuid) -> DomainResult<u64>;

    /// 发给 user 的全部未删除未读消息，最新在前
    async fn unread_for(&self, user_id: Uuid) -> DomainResult<Vec<Message>>;

    /// 两个用户之间双向的消息，排除软删除行，最新在前，最多 limit 条
    async fn history_between(
        &self,
        user_id: Uuid,
        other_id: Uuid,
        limit: u32,
    ) -> DomainResult<Vec<Message>>;

    /// 软删除一条消息（调用方的权限校验在服务层完成）
    async fn soft_delete(&self, message_id: i64) -> DomainResult<()>;
}
