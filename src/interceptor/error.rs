//! 拦截引擎错误类型定义

use thiserror::Error;

/// 拦截引擎错误类型
#[derive(Debug, Error)]
pub enum InterceptorError {
    /// 无效的正则表达式模式
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// 序列化错误
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 配置读写错误
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 规则校验错误
    #[error("Validation error: {0}")]
    ValidationError(String),
}
