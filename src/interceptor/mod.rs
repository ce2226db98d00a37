//! Interceptor 模块 - 敏感信息检测管线
//!
//! 提供正则驱动的敏感信息检测、规则过滤与风险评分。
//! 检测 -> 过滤 -> 评分 均为纯同步计算，单次 pass 内有界完成。

mod detector;
mod error;
mod patterns;
mod record;
mod rules;
mod score;

pub use detector::{Detector, Finding, MAX_SAMPLE_MATCHES, MIN_SCAN_CHARS};
pub use error::InterceptorError;
pub use patterns::{Category, PatternCatalog, PatternDefinition, PatternSeed, Severity, BUILTIN_PATTERNS};
pub use record::{text_fingerprint, Decision, EventSink, InterceptionEvent, NullSink};
pub use rules::{filter_findings, validate_regex_pattern, RuleConfiguration, CATEGORY_WILDCARD};
pub use score::{score, RiskAssessment, RiskLevel};

pub(crate) use detector::is_network_false_positive;

#[cfg(test)]
pub(crate) use record::testing;

#[cfg(test)]
mod extended_tests;
