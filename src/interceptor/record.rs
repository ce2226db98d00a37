//! 拦截事件数据模型
//!
//! 定义拦截决策的结构化事件，供外部审计/遥测收集方消费。
//! 事件只携带类别与风险等级，不携带原文；需要关联文本时使用哈希指纹。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::patterns::Category;
use super::score::RiskLevel;
use crate::redaction::RedactionStrategy;

/// 拦截决策
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// 发现敏感内容，提交已拦截
    Blocked,
    /// 用户执行了脱敏
    Remediated,
    /// 用户选择直接发送
    Overridden,
    /// 敏感内容消失，拦截解除
    Cleared,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocked => "blocked",
            Self::Remediated => "remediated",
            Self::Overridden => "overridden",
            Self::Cleared => "cleared",
        }
    }
}

/// 拦截事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterceptionEvent {
    /// 事件 ID (UUID)
    pub id: String,
    /// 时间戳
    pub timestamp: DateTime<Utc>,
    /// 拦截决策
    pub decision: Decision,
    /// 命中的敏感类别 (去重)
    pub categories: Vec<Category>,
    /// 总体风险等级
    pub risk_level: RiskLevel,
    /// 使用的脱敏策略 (仅 Remediated 事件携带)
    pub strategy_used: Option<RedactionStrategy>,
}

impl InterceptionEvent {
    /// 创建新事件
    pub fn new(
        decision: Decision,
        categories: Vec<Category>,
        risk_level: RiskLevel,
        strategy_used: Option<RedactionStrategy>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            decision,
            categories,
            risk_level,
            strategy_used,
        }
    }
}

/// 事件收集方接口
///
/// emit 为 fire-and-forget：实现方自行吞掉内部失败，
/// 任何情况下都不得影响拦截主循环。
pub trait EventSink: Send + Sync {
    fn emit(&self, event: InterceptionEvent);
}

/// 丢弃所有事件的空实现
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: InterceptionEvent) {}
}

/// 计算文本指纹 (SHA-256 十六进制)
///
/// 不存原文，仅用于同一文本的跨 pass 比对
pub fn text_fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
