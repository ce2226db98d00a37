//! 远程改写服务接口与 HTTP 实现
//!
//! 改写服务负责把含敏感内容的文本改写为保留意图的安全版本。
//! 服务是可选能力：未配置时为正常的类型化状态，不做运行时探测。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interceptor::Category;

/// 改写请求默认超时
pub const DEFAULT_REWRITE_TIMEOUT: Duration = Duration::from_secs(15);

/// 改写系统指令
///
/// 约定：保留原意、移除敏感字面量、不得输出方括号占位符
const REWRITE_SYSTEM_PROMPT: &str = "You rewrite user text to remove sensitive content. \
Preserve the author's intent and tone. Remove or paraphrase every literal secret, credential, \
identifier, or contact detail. Never insert bracketed placeholder tokens; produce natural prose. \
Reply with the rewritten text only.";

/// 每千 token 成本估算 (USD)
const PROMPT_COST_PER_1K: f64 = 0.00015;
const COMPLETION_COST_PER_1K: f64 = 0.0006;

/// 改写错误
///
/// 每个失败模式都必须落到脱敏引擎的回退路径，不允许向上层抛未处理异常
#[derive(Debug, Error)]
pub enum RewriteError {
    /// 认证失败
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// 配额或账单问题
    #[error("Quota or billing error: {0}")]
    Quota(String),

    /// 触发限流
    #[error("Rate limited by rewrite service")]
    RateLimited,

    /// 请求超时
    #[error("Rewrite request timed out")]
    Timeout,

    /// 网络错误
    #[error("Network error: {0}")]
    Network(String),

    /// 响应格式错误或为空
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// 服务未配置
    #[error("Rewrite service is not configured")]
    Disabled,
}

/// token 用量
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// 改写响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteResponse {
    /// 改写后的文本
    pub text: String,
    /// token 用量
    pub token_usage: TokenUsage,
    /// 成本估算 (USD)
    pub cost_estimate: f64,
}

/// 改写服务接口
#[async_trait]
pub trait RewriteService: Send + Sync {
    /// 改写文本
    ///
    /// # Arguments
    /// * `text` - 原始文本
    /// * `categories` - 检出的敏感类别 (提示服务重点处理)
    async fn rewrite(
        &self,
        text: &str,
        categories: &[Category],
    ) -> Result<RewriteResponse, RewriteError>;
}

/// 共享的 RewriteService 类型别名
pub type SharedRewriteService = Arc<dyn RewriteService>;

/// HTTP 改写服务配置
#[derive(Debug, Clone)]
pub struct RewriteConfig {
    /// 服务基础 URL
    pub base_url: String,
    /// API Key
    pub api_key: String,
    /// 模型名
    pub model: String,
    /// 请求超时 (超时按失败处理，进入回退)
    pub timeout: Duration,
}

impl RewriteConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: DEFAULT_REWRITE_TIMEOUT,
        }
    }
}

/// Chat Completions 响应结构 (只解析需要的字段)
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// 基于 Chat Completions 协议的 HTTP 改写服务
pub struct HttpRewriteService {
    /// HTTP 客户端
    http_client: reqwest::Client,
    /// 服务配置
    config: RewriteConfig,
}

impl HttpRewriteService {
    /// 创建新的改写服务
    pub fn new(config: RewriteConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl RewriteService for HttpRewriteService {
    async fn rewrite(
        &self,
        text: &str,
        categories: &[Category],
    ) -> Result<RewriteResponse, RewriteError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let category_list = categories
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": REWRITE_SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!("Detected sensitive categories: {}\n\n{}", category_list, text),
                },
            ],
        });

        // 发送请求 (显式超时，超时计为失败而不是无限挂起)
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RewriteError::Timeout
                } else {
                    RewriteError::Network(e.to_string())
                }
            })?;

        // 检查响应状态
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RewriteError::Auth(body_text),
                StatusCode::PAYMENT_REQUIRED => RewriteError::Quota(body_text),
                StatusCode::TOO_MANY_REQUESTS => RewriteError::RateLimited,
                _ => RewriteError::Network(format!("HTTP {}: {}", status, body_text)),
            });
        }

        // 解析响应
        let payload: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| RewriteError::MalformedResponse(e.to_string()))?;

        let rewritten = payload
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        if rewritten.trim().is_empty() {
            return Err(RewriteError::MalformedResponse(
                "empty completion text".to_string(),
            ));
        }

        let token_usage = payload
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        let cost_estimate = f64::from(token_usage.prompt_tokens) / 1000.0 * PROMPT_COST_PER_1K
            + f64::from(token_usage.completion_tokens) / 1000.0 * COMPLETION_COST_PER_1K;

        Ok(RewriteResponse {
            text: rewritten,
            token_usage,
            cost_estimate,
        })
    }
}
