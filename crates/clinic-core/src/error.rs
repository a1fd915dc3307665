//! 错误定义模块

use thiserror::Error;

/// 预约系统统一错误类型
#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("资源冲突: {0}")]
    Conflict(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("权限错误: {0}")]
    Permission(String),

    #[error("状态错误: {0}")]
    State(String),

    #[error("无效令牌: {0}")]
    InvalidToken(String),

    #[error("令牌已过期: {0}")]
    ExpiredToken(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

/// 预约系统统一结果类型
pub type Result<T> = std::result::Result<T, ClinicError>;
