//! 领域错误定义
//!
//! 网关的错误分类：参数校验、权限、资源不存在、存储故障。
//! 认证失败在连接升级前以 HTTP 401 拒绝（见 web 层）；
//! 离线投递不是错误（见会话注册表的 DeliverOutcome）。

use thiserror::Error;

/// 领域错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 参数校验错误
    #[error("验证失败: {field}: {message}")]
    ValidationError { field: String, message: String },

    /// 权限错误（操作他人的消息或会话）
    #[error("权限不足: {action}")]
    PermissionDenied { action: String },

    /// 资源不存在
    #[error("资源不存在: {resource_type} ID {resource_id}")]
    ResourceNotFound {
        resource_type: String,
        resource_id: String,
    },

    /// 存储层瞬时故障，调用方可安全重试同一操作
    #[error("数据库错误: {message}")]
    DatabaseError { message: String },
}

impl DomainError {
    /// 创建验证错误
    pub fn validation_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// 创建权限错误
    pub fn permission_denied(action: impl Into<String>) -> Self {
        Self::PermissionDenied {
            action: action.into(),
        }
    }

    /// 创建资源不存在错误
    pub fn resource_not_found(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self::ResourceNotFound {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }

    /// 创建数据库错误
    pub fn database_error(message: impl Into<String>) -> Self {
        Self::DatabaseError {
            message: message.into(),
        }
    }
}

/// 领域结果类型
pub type DomainResult<T> = Result<T, DomainError>;
