//! Unified application error types
//!
//! Provides a single error type for the entire library,
//! suitable for returning to embedding hosts over a serialization boundary.

use serde::Serialize;
use thiserror::Error;

use crate::interceptor::InterceptorError;
use crate::redaction::RewriteError;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// 检测管线错误 (模式编译/配置)
    #[error("拦截引擎错误: {0}")]
    Interceptor(#[from] InterceptorError),

    /// 改写服务错误
    #[error("改写服务错误: {0}")]
    Rewrite(#[from] RewriteError),

    /// File operation error
    #[error("文件操作错误: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("内部错误: {0}")]
    Internal(String),
}

/// Serializable error response for host IPC
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for client-side handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        let (code, message) = err.parts();
        Self { code, message }
    }
}

// Implement Serialize for AppError so hosts can pass it across IPC directly
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let (code, message) = self.parts();
        ErrorResponse { code, message }.serialize(serializer)
    }
}

impl AppError {
    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn parts(&self) -> (String, String) {
        match self {
            Self::Interceptor(e) => ("INTERCEPTOR_ERROR".to_string(), e.to_string()),
            Self::Rewrite(e) => ("REWRITE_ERROR".to_string(), e.to_string()),
            Self::Io(e) => ("IO_ERROR".to_string(), e.to_string()),
            Self::Internal(msg) => ("INTERNAL_ERROR".to_string(), msg.clone()),
        }
    }
}
