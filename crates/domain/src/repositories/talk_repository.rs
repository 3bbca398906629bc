//! 会话目录接口
//!
//! 用户对的规范身份与摘要缓存。

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::message::MessageKind;
use crate::entities::talk::{Talk, TalkSetting};
use crate::errors::DomainResult;

#[async_trait]
pub trait TalkRepository: Send + Sync {
    /// 解析或创建用户对的唯一会话
    ///
    /// 实现必须在并发双向调用下安全：规范对上的唯一约束兜底，
    /// 创建竞争的败方回读胜方的行而不是报错。
    async fn get_or_create(&self, user_a: Uuid, user_b: Uuid) -> DomainResult<Talk>;

    async fn find_by_id(&self, talk_id: Uuid) -> DomainResult<Option<Talk>>;

    /// 覆盖写入最近消息缓存三元组，last-writer-wins
    async fn update_last_message(
        &self,
        talk_id: Uuid,
        content: &str,
        kind: MessageKind,
    ) -> DomainResult<()>;

    /// 写入某参与者一侧的置顶标记
    async fn set_pinned(&self, talk_id: Uuid, user_id: Uuid, pinned: bool) -> DomainResult<()>;

    /// 写入某参与者一侧的禁用（免打扰/停用）标记
    async fn set_disabled(&self, talk_id: Uuid, user_id: Uuid, disabled: bool) -> DomainResult<()>;

    /// 读取某参与者一侧的设置，缺省为未置顶、未禁用
    async fn setting_for(&self, talk_id: Uuid, user_id: Uuid) -> DomainResult<TalkSetting>;

    /// 软删除会话，对双方的列表与查找都不再可见
    ///
    /// 同一对用户再次调用 get_or_create 时复活同一行，消息历史保留。
    async fn soft_delete(&self, talk_id: Uuid) -> DomainResult<()>;

    /// user 参与的全部未删除、且未被其禁用的会话，按最近消息时间倒序
    async fn list_for_user(&self, user_id: Uuid) -> DomainResult<Vec<Talk>>;
}
