//! 拦截规则配置模块
//!
//! 用户可按类别/规则粒度启用或禁用拦截，并维护自定义检测模式。
//! 配置缺失时一律保留 Finding (宁可多拦，不可漏放)。

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::detector::Finding;
use super::error::InterceptorError;
use super::patterns::{Category, PatternSeed};

/// 配置文件名
const CONFIG_FILENAME: &str = "interception-rules.json";

/// 类别级通配规则键
pub const CATEGORY_WILDCARD: &str = "*";

/// 拦截规则配置
///
/// 外部设置面板下发的快照：类别 -> (规则键 -> 是否启用拦截)。
/// 规则键为模式 ID，或 "*" 表示整个类别。
/// 缺失的条目默认启用拦截。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RuleConfiguration {
    /// 各类别的规则启用状态
    pub categories: HashMap<Category, HashMap<String, bool>>,
    /// 用户自定义检测模式列表
    pub custom_patterns: Vec<PatternSeed>,
}

impl RuleConfiguration {
    /// 创建空配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从配置目录加载配置
    ///
    /// # Arguments
    /// * `config_dir` - 配置目录路径
    ///
    /// # Returns
    /// 配置对象，如果文件不存在则返回默认配置
    pub fn load(config_dir: &Path) -> Result<Self, InterceptorError> {
        let config_path = config_dir.join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| {
            InterceptorError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            InterceptorError::ConfigError(format!("Failed to parse config file: {}", e))
        })
    }

    /// 保存配置到配置目录
    pub fn save(&self, config_dir: &Path) -> Result<(), InterceptorError> {
        let config_path = config_dir.join(CONFIG_FILENAME);

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).map_err(|e| {
                InterceptorError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|e| {
            InterceptorError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(&config_path, content).map_err(|e| {
            InterceptorError::ConfigError(format!("Failed to write config file: {}", e))
        })
    }

    /// 查询某个 Finding 对应的显式规则条目
    ///
    /// 先查模式 ID，再查类别通配；都没有则返回 None (调用方按默认启用处理)
    pub fn rule_entry(&self, category: Category, pattern_id: &str) -> Option<bool> {
        let entries = self.categories.get(&category)?;
        entries
            .get(pattern_id)
            .or_else(|| entries.get(CATEGORY_WILDCARD))
            .copied()
    }

    /// 设置单条规则的启用状态
    pub fn set_rule(&mut self, category: Category, rule_key: &str, enabled: bool) {
        self.categories
            .entry(category)
            .or_default()
            .insert(rule_key.to_string(), enabled);
    }

    /// 设置整个类别的启用状态 (写入通配键)
    pub fn set_category(&mut self, category: Category, enabled: bool) {
        self.set_rule(category, CATEGORY_WILDCARD, enabled);
    }

    /// 添加自定义模式
    ///
    /// # Returns
    /// 如果模式 ID 已存在或正则无效则返回错误
    pub fn add_custom_pattern(&mut self, seed: PatternSeed) -> Result<(), InterceptorError> {
        if self.custom_patterns.iter().any(|p| p.id == seed.id) {
            return Err(InterceptorError::ValidationError(format!(
                "Custom pattern with id '{}' already exists",
                seed.id
            )));
        }

        if seed.label.trim().is_empty() {
            return Err(InterceptorError::ValidationError(
                "Pattern label cannot be empty".to_string(),
            ));
        }

        validate_regex_pattern(&seed.pattern)?;

        self.custom_patterns.push(seed);
        Ok(())
    }

    /// 删除自定义模式
    pub fn remove_custom_pattern(&mut self, pattern_id: &str) -> Result<(), InterceptorError> {
        let original_len = self.custom_patterns.len();
        self.custom_patterns.retain(|p| p.id != pattern_id);

        if self.custom_patterns.len() == original_len {
            return Err(InterceptorError::ValidationError(format!(
                "Custom pattern with id '{}' not found",
                pattern_id
            )));
        }

        Ok(())
    }

    /// 更新自定义模式
    pub fn update_custom_pattern(&mut self, seed: PatternSeed) -> Result<(), InterceptorError> {
        if seed.label.trim().is_empty() {
            return Err(InterceptorError::ValidationError(
                "Pattern label cannot be empty".to_string(),
            ));
        }

        validate_regex_pattern(&seed.pattern)?;

        if let Some(existing) = self.custom_patterns.iter_mut().find(|p| p.id == seed.id) {
            *existing = seed;
            Ok(())
        } else {
            Err(InterceptorError::ValidationError(format!(
                "Custom pattern with id '{}' not found",
                seed.id
            )))
        }
    }
}

/// 按规则配置过滤 Finding 列表
///
/// 显式 `false` 条目丢弃 Finding；显式 `true` 或没有任何条目时保留。
/// 配置尚未加载 (None) 时保留全部 Finding，配置缺失不等于全部放行。
pub fn filter_findings(findings: Vec<Finding>, config: Option<&RuleConfiguration>) -> Vec<Finding> {
    let Some(config) = config else {
        return findings;
    };

    findings
        .into_iter()
        .filter(|f| config.rule_entry(f.category, &f.pattern_id).unwrap_or(true))
        .collect()
}

/// 验证正则表达式是否有效
pub fn validate_regex_pattern(pattern: &str) -> Result<(), InterceptorError> {
    if pattern.trim().is_empty() {
        return Err(InterceptorError::ValidationError(
            "Regex pattern cannot be empty".to_string(),
        ));
    }

    Regex::new(pattern)
        .map_err(|e| InterceptorError::ValidationError(format!("Invalid regex pattern: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::detector::Detector;
    use crate::interceptor::patterns::Severity;
    use tempfile::tempdir;

    fn sample_findings() -> Vec<Finding> {
        Detector::with_defaults()
            .unwrap()
            .detect("SSN 123-45-6789 and key sk-aaaaaaaaaaaaaaaaaaaaaaaa")
    }

    #[test]
    fn test_default_config() {
        let config = RuleConfiguration::new();
        assert!(config.categories.is_empty());
        assert!(config.custom_patterns.is_empty());
    }

    #[test]
    fn test_filter_without_config_keeps_all() {
        // fail safe: 配置缺失时保留全部 Finding
        let findings = sample_findings();
        let expected = findings.len();
        let filtered = filter_findings(findings, None);
        assert_eq!(filtered.len(), expected);
    }

    #[test]
    fn test_filter_with_empty_config_keeps_all() {
        let findings = sample_findings();
        let expected = findings.len();
        let config = RuleConfiguration::new();
        let filtered = filter_findings(findings, Some(&config));
        assert_eq!(filtered.len(), expected);
    }

    #[test]
    fn test_filter_category_disabled() {
        let mut config = RuleConfiguration::new();
        config.set_category(Category::PersonalId, false);

        let filtered = filter_findings(sample_findings(), Some(&config));
        assert!(!filtered.iter().any(|f| f.category == Category::PersonalId));
        assert!(filtered.iter().any(|f| f.category == Category::Credential));
    }

    #[test]
    fn test_filter_single_rule_disabled() {
        let mut config = RuleConfiguration::new();
        config.set_rule(Category::Credential, "openai_api_key", false);

        let filtered = filter_findings(sample_findings(), Some(&config));
        assert!(!filtered.iter().any(|f| f.pattern_id == "openai_api_key"));
        assert!(filtered.iter().any(|f| f.category == Category::PersonalId));
    }

    #[test]
    fn test_rule_entry_precedence() {
        // 模式 ID 条目优先于类别通配
        let mut config = RuleConfiguration::new();
        config.set_category(Category::Credential, false);
        config.set_rule(Category::Credential, "openai_api_key", true);

        assert_eq!(config.rule_entry(Category::Credential, "openai_api_key"), Some(true));
        assert_eq!(config.rule_entry(Category::Credential, "github_token"), Some(false));
        assert_eq!(config.rule_entry(Category::Contact, "email_address"), None);
    }

    #[test]
    fn test_explicit_true_keeps_finding() {
        let mut config = RuleConfiguration::new();
        config.set_rule(Category::PersonalId, "us_ssn", true);

        let filtered = filter_findings(sample_findings(), Some(&config));
        assert!(filtered.iter().any(|f| f.pattern_id == "us_ssn"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let dir = tempdir().unwrap();
        let config = RuleConfiguration::load(dir.path()).unwrap();
        assert!(config.categories.is_empty());
        assert!(config.custom_patterns.is_empty());
    }

    #[test]
    fn test_save_and_load_config() {
        let dir = tempdir().unwrap();
        let mut config = RuleConfiguration::new();

        config.set_category(Category::Network, false);
        config.set_rule(Category::Credential, "openai_api_key", true);

        let custom = PatternSeed::custom("custom_1", "My Rule", r"\btest\b");
        config.add_custom_pattern(custom).unwrap();

        config.save(dir.path()).unwrap();

        let loaded = RuleConfiguration::load(dir.path()).unwrap();
        assert_eq!(loaded.rule_entry(Category::Network, "ipv4_address"), Some(false));
        assert_eq!(loaded.rule_entry(Category::Credential, "openai_api_key"), Some(true));
        assert_eq!(loaded.custom_patterns.len(), 1);
        assert_eq!(loaded.custom_patterns[0].id, "custom_1");
    }

    #[test]
    fn test_add_duplicate_custom_pattern() {
        let mut config = RuleConfiguration::new();
        let p1 = PatternSeed::custom("dup_id", "Rule 1", r"\btest\b");
        let p2 = PatternSeed::custom("dup_id", "Rule 2", r"\btest2\b");

        config.add_custom_pattern(p1).unwrap();
        assert!(config.add_custom_pattern(p2).is_err());
    }

    #[test]
    fn test_add_pattern_with_empty_label() {
        let mut config = RuleConfiguration::new();
        let p = PatternSeed::custom("empty_label", "  ", r"\btest\b");
        assert!(config.add_custom_pattern(p).is_err());
    }

    #[test]
    fn test_add_pattern_with_invalid_regex() {
        let mut config = RuleConfiguration::new();
        let p = PatternSeed::custom("invalid_regex", "Invalid", r"[unclosed");
        assert!(config.add_custom_pattern(p).is_err());
    }

    #[test]
    fn test_remove_custom_pattern() {
        let mut config = RuleConfiguration::new();
        let p = PatternSeed::custom("to_remove", "Remove Me", r"\btest\b");
        config.add_custom_pattern(p).unwrap();
        assert_eq!(config.custom_patterns.len(), 1);

        config.remove_custom_pattern("to_remove").unwrap();
        assert_eq!(config.custom_patterns.len(), 0);
    }

    #[test]
    fn test_remove_nonexistent_pattern() {
        let mut config = RuleConfiguration::new();
        assert!(config.remove_custom_pattern("nonexistent").is_err());
    }

    #[test]
    fn test_update_custom_pattern() {
        let mut config = RuleConfiguration::new();
        let p = PatternSeed::custom("update_me", "Original", r"\boriginal\b");
        config.add_custom_pattern(p).unwrap();

        let mut updated = PatternSeed::custom("update_me", "Updated", r"\bupdated\b");
        updated.severity = Severity::High;
        config.update_custom_pattern(updated).unwrap();

        assert_eq!(config.custom_patterns[0].label, "Updated");
        assert_eq!(config.custom_patterns[0].pattern, r"\bupdated\b");
        assert_eq!(config.custom_patterns[0].severity, Severity::High);
    }

    #[test]
    fn test_validate_regex_pattern() {
        // 有效模式
        assert!(validate_regex_pattern(r"\btest\b").is_ok());
        assert!(validate_regex_pattern(r"[a-zA-Z0-9]+").is_ok());

        // 无效模式
        assert!(validate_regex_pattern(r"[unclosed").is_err());

        // 空模式
        assert!(validate_regex_pattern("").is_err());
        assert!(validate_regex_pattern("   ").is_err());
    }
}
