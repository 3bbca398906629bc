//! 用户目录接口（外部协作方）
//!
//! 仅用于装饰消息与会话摘要的展示信息查询。

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::user::UserProfile;
use crate::errors::DomainResult;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, user_id: Uuid) -> DomainResult<Option<UserProfile>>;
}
