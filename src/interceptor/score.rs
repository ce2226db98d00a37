//! 风险评分
//!
//! 将 Finding 列表折算为 0-100 的完整性分数和总体风险等级。
//! 100 表示未发现任何敏感内容。

use serde::{Deserialize, Serialize};
use std::fmt;

use super::detector::Finding;
use super::patterns::Severity;

/// 各严重程度的基础扣分
const HIGH_PENALTY: i32 = 30;
const MEDIUM_PENALTY: i32 = 15;
const LOW_PENALTY: i32 = 5;

/// 同一模式重复出现的追加扣分 (首次之外每次)
const REPEAT_PENALTY: i32 = 5;

/// 总体风险等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl From<Severity> for RiskLevel {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Low => Self::Low,
            Severity::Medium => Self::Medium,
            Severity::High => Self::High,
        }
    }
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 风险评估结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// 完整性分数 [0, 100]
    pub integrity_score: u8,
    /// 总体风险等级 (Finding 中的最大严重度)
    pub risk_level: RiskLevel,
    /// Finding 数量
    pub finding_count: usize,
}

impl RiskAssessment {
    /// 无 Finding 时的满分评估
    pub fn clean() -> Self {
        Self {
            integrity_score: 100,
            risk_level: RiskLevel::Low,
            finding_count: 0,
        }
    }
}

/// 对 Finding 列表进行评分
///
/// 从 100 起扣：每条 Finding 按严重程度扣基础分，
/// 同一模式重复出现时每多一次追加扣分，避免重复泄漏与单次泄漏同分。
/// 结果夹在 [0, 100]。
pub fn score(findings: &[Finding]) -> RiskAssessment {
    if findings.is_empty() {
        return RiskAssessment::clean();
    }

    let mut total: i32 = 100;
    let mut max_severity = Severity::Low;

    for finding in findings {
        let base = match finding.severity {
            Severity::High => HIGH_PENALTY,
            Severity::Medium => MEDIUM_PENALTY,
            Severity::Low => LOW_PENALTY,
        };
        let repeats = finding.occurrence_count.saturating_sub(1) as i32;
        total -= base + repeats * REPEAT_PENALTY;

        max_severity = max_severity.max(finding.severity);
    }

    RiskAssessment {
        integrity_score: total.clamp(0, 100) as u8,
        risk_level: max_severity.into(),
        finding_count: findings.len(),
    }
}
