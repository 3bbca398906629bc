//! 应用层
//!
//! 编排领域仓储与会话注册表：消息收发、已读、未读、历史查询，
//! 以及会话的获取/创建、置顶、禁用。会话注册表是本子系统唯一的
//! 共享可变状态。

pub mod error;
pub mod memory;
pub mod services;
pub mod session_registry;

pub use error::{ApplicationError, ApplicationResult};
pub use services::chat_service::{ChatService, ChatServiceDependencies};
pub use services::talk_service::TalkService;
pub use session_registry::{DeliverOutcome, SessionHandle, SessionRegistry};
