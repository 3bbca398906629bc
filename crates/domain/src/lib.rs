//! 领域层
//!
//! 定义即时通讯网关的核心实体（消息、会话、在线连接视图）、
//! 仓储接口和领域错误类型。不依赖任何具体的存储或网络实现。

pub mod entities;
pub mod errors;
pub mod repositories;

pub use entities::frame::{ClientFrame, MessageView, SendReceipt, ServerFrame, TalkView};
pub use entities::message::{Message, MessageKind, NewMessage};
pub use entities::talk::{Talk, TalkSetting};
pub use entities::user::UserProfile;
pub use errors::{DomainError, DomainResult};
