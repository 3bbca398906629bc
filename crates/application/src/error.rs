use domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
}

impl ApplicationError {
    /// 面向客户端的一行错误文案（操作级 ERROR 帧的 error 字段）
    ///
    /// 存储层错误只回统一文案，具体原因留在日志里。
    pub fn client_message(&self) -> String {
        match self {
            ApplicationError::Domain(DomainError::DatabaseError { .. }) => {
                "服务暂时不可用，请重试".to_string()
            }
            ApplicationError::Domain(err) => err.to_string(),
        }
    }
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;
