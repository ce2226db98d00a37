//! 检测引擎
//!
//! 对文本执行全量模式匹配，按模式聚合产生 Finding 列表。
//! Detector 不修改原文，只报告检测结果；同样的输入永远产生同样的输出。

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::InterceptorError;
use super::patterns::{Category, PatternCatalog, PatternDefinition, Severity};

/// 低于该字符数的文本直接跳过检测 (避免瞬时击键产生误报)
pub const MIN_SCAN_CHARS: usize = 3;

/// 每个 Finding 保留的样例匹配上限
pub const MAX_SAMPLE_MATCHES: usize = 5;

/// 检测结果
///
/// 一个 Finding 聚合同一模式在文本中的全部匹配
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// 命中的模式 ID
    pub pattern_id: String,
    /// 模式显示名称
    pub label: String,
    /// 敏感信息类别
    pub category: Category,
    /// 严重程度
    pub severity: Severity,
    /// 匹配总次数
    pub occurrence_count: usize,
    /// 样例匹配 (最多 MAX_SAMPLE_MATCHES 条)
    pub sample_matches: Vec<String>,
}

/// 检测器
///
/// 持有共享的模式目录；detect 为纯函数，无内部可变状态
pub struct Detector {
    catalog: Arc<PatternCatalog>,
}

impl Detector {
    /// 使用指定目录创建检测器
    pub fn new(catalog: Arc<PatternCatalog>) -> Self {
        Self { catalog }
    }

    /// 使用默认内置模式创建检测器
    pub fn with_defaults() -> Result<Self, InterceptorError> {
        Ok(Self::new(Arc::new(PatternCatalog::builtin()?)))
    }

    /// 共享的模式目录
    pub fn catalog(&self) -> &Arc<PatternCatalog> {
        &self.catalog
    }

    /// 扫描文本内容
    ///
    /// # Arguments
    /// * `text` - 待检测文本
    ///
    /// # Returns
    /// 按目录顺序排列的 Finding 列表，每个命中模式一条
    pub fn detect(&self, text: &str) -> Vec<Finding> {
        if text.chars().count() < MIN_SCAN_CHARS {
            return Vec::new();
        }

        // 使用 RegexSet 快速确定哪些模式可能匹配
        let matching_indices: Vec<_> = self.catalog.regex_set().matches(text).into_iter().collect();

        let mut findings = Vec::new();

        for idx in matching_indices {
            let def = &self.catalog.all_patterns()[idx];

            let mut occurrence_count = 0;
            let mut sample_matches = Vec::new();

            for mat in def.matcher.find_iter(text) {
                if is_network_false_positive(def, text, mat.start(), mat.as_str()) {
                    continue;
                }

                occurrence_count += 1;
                if sample_matches.len() < MAX_SAMPLE_MATCHES {
                    sample_matches.push(mat.as_str().to_string());
                }
            }

            if occurrence_count > 0 {
                findings.push(Finding {
                    pattern_id: def.id.clone(),
                    label: def.label.clone(),
                    category: def.category,
                    severity: def.severity,
                    occurrence_count,
                    sample_matches,
                });
            }
        }

        findings
    }
}

/// 网络类匹配的误报过滤
///
/// 与脱敏引擎共用同一套判定，保证「检测到什么就替换什么」
pub(crate) fn is_network_false_positive(
    def: &PatternDefinition,
    text: &str,
    start: usize,
    matched: &str,
) -> bool {
    if def.category != Category::Network {
        return false;
    }

    // 跳过 localhost IP (127.x.x.x)
    if matched.starts_with("127.") {
        return true;
    }

    // 跳过版本号 (如 v1.2.3.4)
    if start > 0 {
        let prev_char = text[..start].chars().last();
        if prev_char == Some('v') || prev_char == Some('V') {
            return true;
        }
    }

    false
}
