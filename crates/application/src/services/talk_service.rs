//! 会话服务
//!
//! 会话目录之上的薄编排：获取/创建、置顶、禁用、会话列表装饰。

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use domain::repositories::{TalkRepository, UserRepository};
use domain::{DomainError, Talk, TalkView};

use crate::error::ApplicationResult;

pub struct TalkService {
    talk_repository: Arc<dyn TalkRepository>,
    user_repository: Arc<dyn UserRepository>,
}

impl TalkService {
    pub fn new(
        talk_repository: Arc<dyn TalkRepository>,
        user_repository: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            talk_repository,
            user_repository,
        }
    }

    /// 解析或创建两个用户之间的唯一会话；幂等
    pub async fn get_or_create(&self, user_a: Uuid, user_b: Uuid) -> ApplicationResult<Talk> {
        if user_a == user_b {
            return Err(DomainError::validation_error("to", "会话需要两个不同的用户").into());
        }
        Ok(self.talk_repository.get_or_create(user_a, user_b).await?)
    }

    /// 设置 caller 一侧的置顶标记
    pub async fn set_pinned(
        &self,
        talk_id: Uuid,
        caller_id: Uuid,
        pinned: bool,
    ) -> ApplicationResult<()> {
        self.require_participant(talk_id, caller_id).await?;
        self.talk_repository
            .set_pinned(talk_id, caller_id, pinned)
            .await?;
        Ok(())
    }

    /// 禁用 caller 一侧的会话（不影响消息历史与对端视图）
    pub async fn disable(&self, talk_id: Uuid, caller_id: Uuid) -> ApplicationResult<()> {
        self.require_participant(talk_id, caller_id).await?;
        self.talk_repository
            .set_disabled(talk_id, caller_id, true)
            .await?;
        Ok(())
    }

    /// 软删除会话，对双方都不再可见
    ///
    /// 消息历史保留；同一对用户再次互发消息时会话复活。
    pub async fn delete(&self, talk_id: Uuid, caller_id: Uuid) -> ApplicationResult<()> {
        self.require_participant(talk_id, caller_id).await?;
        self.talk_repository.soft_delete(talk_id).await?;
        Ok(())
    }

    /// caller 的会话列表：未删除、未被其禁用，按最近消息时间倒序，
    /// 附带对端展示信息与自己一侧的设置
    pub async fn list_for_user(&self, caller_id: Uuid) -> ApplicationResult<Vec<TalkView>> {
        let talks = self.talk_repository.list_for_user(caller_id).await?;
        let mut views = Vec::with_capacity(talks.len());
        for talk in &talks {
            let peer_id = talk.peer_of(caller_id)?;
            let setting = self.talk_repository.setting_for(talk.id, caller_id).await?;
            let peer = match self.user_repository.find_by_id(peer_id).await {
                Ok(profile) => profile,
                Err(err) => {
                    warn!(user_id = %peer_id, error = %err, "查询对端展示信息失败");
                    None
                }
            };
            views.push(TalkView::new(talk, peer_id, peer.as_ref(), &setting));
        }
        Ok(views)
    }

    /// 校验 caller 是会话参与者
    async fn require_participant(&self, talk_id: Uuid, caller_id: Uuid) -> ApplicationResult<Talk> {
        let talk = self
            .talk_repository
            .find_by_id(talk_id)
            .await?
            .ok_or_else(|| DomainError::resource_not_found("talk", talk_id.to_string()))?;
        if !talk.has_participant(caller_id) {
            return Err(DomainError::permission_denied("不是会话参与者").into());
        }
        Ok(talk)
    }
}
